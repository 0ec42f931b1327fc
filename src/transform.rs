//! Auto-formatting applied to the editor text on every keystroke.

pub const BULLET: &str = "• ";
pub const BARE_BULLET: &str = "•";
pub const ARROW: &str = "→";

/// Applies bullet continuation or bullet removal, then markdown bullet
/// conversion, then arrow substitution.
///
/// ```
/// use note_codec::transform;
///
/// assert_eq!(transform("• a\n", "• a"), "• a\n• ");
/// assert_eq!(transform("a->b", "a"), "a→b");
/// ```
pub fn transform(new_text: &str, old_text: &str) -> String {
    let new_len = new_text.chars().count();
    let old_len = old_text.chars().count();

    let text = if new_len > old_len {
        continue_bullet(new_text)
    } else if new_len < old_len {
        remove_bare_bullet(new_text, old_text)
    } else {
        new_text.to_string()
    };

    convert_markdown_bullets(&text).replace("->", ARROW)
}

/// Enter after a bulleted line appends `"• "`. Enter on an empty line right
/// after a bulleted line drops the new line break and appends `"• "`.
fn continue_bullet(text: &str) -> String {
    let Some(body) = text.strip_suffix('\n') else {
        return text.to_string();
    };

    let mut lines = body.rsplit('\n');
    let entered = lines.next().unwrap_or("");
    if entered.starts_with(BULLET) {
        return format!("{text}{BULLET}");
    }
    if entered.is_empty() && lines.next().is_some_and(|line| line.starts_with(BULLET)) {
        return format!("{body}{BULLET}");
    }
    text.to_string()
}

/// Backspacing the space after a bullet clears the whole bullet.
fn remove_bare_bullet(new_text: &str, old_text: &str) -> String {
    let old_lines: Vec<&str> = old_text.split('\n').collect();
    let mut lines: Vec<&str> = new_text.split('\n').collect();

    let changed = lines.iter().enumerate().position(|(i, line)| {
        *line == BARE_BULLET && old_lines.get(i).is_some_and(|old| old.starts_with(BULLET))
    });
    if let Some(i) = changed {
        lines[i] = "";
    }
    lines.join("\n")
}

fn convert_markdown_bullets(text: &str) -> String {
    text.split('\n')
        .map(|line| match line.strip_prefix("* ").or_else(|| line.strip_prefix("- ")) {
            Some(rest) => format!("{BULLET}{rest}"),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
