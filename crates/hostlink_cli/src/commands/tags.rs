//! Tag manager command.

use super::{CommandResult, Format};
use hostlink_tags::{TagManager, TagManagerConfig};
use std::io::Write;

/// Prints the tag manager snippet, or nothing when no id is configured.
pub fn snippet(tag_id: Option<String>, format: Format, out: &mut impl Write) -> CommandResult {
    let config = TagManagerConfig::from_env().overridden_by(tag_id);
    render(config, format, out)
}

fn render(config: TagManagerConfig, format: Format, out: &mut impl Write) -> CommandResult {
    let manager = TagManager::new(config)?;
    let Some(snippet) = manager.render() else {
        return Ok(());
    };
    match format {
        Format::Text => writeln!(out, "{snippet}")?,
        Format::Json => writeln!(out, "{}", serde_json::to_string_pretty(&snippet)?)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_id_prints_nothing() {
        let mut out = Vec::new();
        render(TagManagerConfig::default(), Format::Text, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn json_output_has_both_parts() {
        let mut out = Vec::new();
        render(TagManagerConfig::with_tag_id("GTM-1"), Format::Json, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert!(value["head_script"].as_str().unwrap().contains("'GTM-1'"));
        assert!(value["body_noscript"].as_str().unwrap().contains("id=GTM-1"));
    }

    #[test]
    fn invalid_id_is_an_error() {
        let err = render(
            TagManagerConfig::with_tag_id("<script>"),
            Format::Text,
            &mut Vec::new(),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("invalid tag id"));
    }
}
