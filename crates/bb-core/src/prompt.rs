//! Prompt assembly. The text sent to the backend is composed from four
//! template fragments around each item; the aspect-ratio hint always comes
//! first and the negative list always comes last.

/// Build the final prompt for one batch item.
///
/// Concatenation order is fixed: aspect fragment, master prefix, item text,
/// suffix, then `", avoid: {negative}"` when a negative list is present.
/// The result is whitespace-trimmed. Same inputs always produce the same
/// string.
pub fn compose(master: &str, item: &str, suffix: &str, negative: &str, aspect_ratio: &str) -> String {
    let mut full = format!("{}{master}{item}{suffix}", aspect_fragment(aspect_ratio));
    if !negative.is_empty() {
        full.push_str(&format!(", avoid: {negative}"));
    }
    full.trim().to_string()
}

/// Natural-language hint for a requested aspect ratio. The default 1:1
/// needs no hint; known ratios use a fixed phrase, anything else gets a
/// generic one.
fn aspect_fragment(ratio: &str) -> String {
    if ratio.is_empty() || ratio == "1:1" {
        return String::new();
    }
    match ratio {
        "21:9" => "Create an image in 21:9 ultra-wide cinematic aspect ratio. ",
        "16:9" => "Create an image in 16:9 widescreen landscape aspect ratio. ",
        "4:3" => "Create an image in 4:3 standard landscape aspect ratio. ",
        "3:2" => "Create an image in 3:2 classic photo landscape aspect ratio. ",
        "9:16" => "Create an image in 9:16 vertical portrait aspect ratio. ",
        "3:4" => "Create an image in 3:4 portrait aspect ratio. ",
        "2:3" => "Create an image in 2:3 classic portrait aspect ratio. ",
        "5:4" => "Create an image in 5:4 almost square landscape aspect ratio. ",
        "4:5" => "Create an image in 4:5 almost square portrait aspect ratio. ",
        other => return format!("Create an image in {other} aspect ratio. "),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_composition() {
        let composed = compose("Epic: ", "a castle", "", "blur", "16:9");
        assert_eq!(
            composed,
            "Create an image in 16:9 widescreen landscape aspect ratio. Epic: a castle, avoid: blur"
        );
    }

    #[test]
    fn test_square_ratio_adds_no_fragment() {
        assert_eq!(compose("", "a cat", "", "", "1:1"), "a cat");
        assert_eq!(compose("", "a cat", "", "", ""), "a cat");
    }

    #[test]
    fn test_unknown_ratio_gets_generic_fragment() {
        let composed = compose("", "a cat", "", "", "7:5");
        assert_eq!(composed, "Create an image in 7:5 aspect ratio. a cat");
    }

    #[test]
    fn test_negative_is_last_segment() {
        let composed = compose("pre ", "mid", " post", "text, watermarks", "1:1");
        assert_eq!(composed, "pre mid post, avoid: text, watermarks");
    }

    #[test]
    fn test_result_is_trimmed() {
        assert_eq!(compose("  ", "a dog", "  ", "", "1:1"), "a dog");
    }

    #[test]
    fn test_deterministic() {
        let a = compose("m", "i", "s", "n", "9:16");
        let b = compose("m", "i", "s", "n", "9:16");
        assert_eq!(a, b);
    }
}
