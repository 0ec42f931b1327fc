use anyhow::{anyhow, Result};
use opendal::{services, Operator};
use url::Url;

/// Operator root for a location: the URI path followed by `root`, as an
/// absolute directory path.
pub fn resolve_root(url: &Url, root: &str) -> String {
    let mut resolved = String::from("/");
    for part in url
        .path()
        .split('/')
        .chain(root.split('/'))
        .filter(|part| !part.is_empty())
    {
        resolved.push_str(part);
        resolved.push('/');
    }
    resolved
}

/// Builds an operator rooted at `root` inside the store named by `uri`.
///
/// - `memory://name`: in-memory, the host only names the store
/// - `file:///var/notes`: local filesystem
/// - `s3://bucket/prefix`: S3, credentials from the environment
pub fn build_operator(uri: &str, root: &str) -> Result<Operator> {
    let url = Url::parse(uri).map_err(|e| anyhow!("Invalid storage URI {}: {}", uri, e))?;
    let root = resolve_root(&url, root);

    let op = match url.scheme() {
        "memory" => Operator::new(services::Memory::default().root(&root))?.finish(),
        "file" => Operator::new(services::Fs::default().root(&root))?.finish(),
        "s3" => {
            let bucket = url
                .host_str()
                .filter(|host| !host.is_empty())
                .ok_or_else(|| anyhow!("S3 URI {} has no bucket", uri))?;
            let builder = services::S3::default()
                .bucket(bucket)
                .root(&root)
                .region("auto");
            Operator::new(builder)?.finish()
        }
        other => return Err(anyhow!("Unsupported storage scheme {:?} in {}", other, uri)),
    };
    Ok(op)
}
