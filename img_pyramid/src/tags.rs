//! Rights and caption tagging through exiftool

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tags written into the finished pyramid; unset or empty fields are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagsInput {
    pub copyright_notice: Option<String>,
    pub image_credit: Option<String>,
    pub web_rights_statement: Option<String>,
    pub usage_terms: Option<String>,
    pub caption: Option<String>,
    pub copyright_status: Option<String>,
    pub source: Option<String>,
}

impl TagsInput {
    pub fn is_empty(&self) -> bool {
        tag_args(self).is_empty()
    }
}

pub trait Tagger: Send + Sync {
    /// Write `tags` into `path` in place, returning the tool's report.
    fn add_tags(&self, path: &Path, tags: &TagsInput) -> Result<String, EngineError>;

    /// Value of tag `name` in `path`, if present.
    fn get_tag(&self, path: &Path, name: &str) -> Result<Option<String>, EngineError>;
}

fn set(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// exiftool assignments for `tags`, without the target file.
pub fn tag_args(tags: &TagsInput) -> Vec<String> {
    let mut args = Vec::with_capacity(10);

    if let Some(v) = set(&tags.copyright_notice) {
        args.push(format!("-MWG:copyright={}", v));
    }
    if let Some(v) = set(&tags.image_credit) {
        args.push(format!("-XMP-photoshop:Credit={}", v));
        args.push(format!("-credit={}", v));
    }
    if let Some(v) = set(&tags.web_rights_statement) {
        args.push(format!("-xmp:webstatement={}", v));
        args.push(format!("-photoshop:URL={}", v));
    }
    if let Some(v) = set(&tags.usage_terms) {
        args.push(format!("-usageterms={}", v));
    }
    if let Some(v) = set(&tags.caption) {
        args.push(format!("-MWG:description={}", v));
    }
    if let Some(v) = set(&tags.copyright_status) {
        args.push(format!("-XMP-xmpRights:marked={}", v));
    }
    if let Some(v) = set(&tags.source) {
        args.push(format!("-XMP-photoshop:Source={}", v));
        args.push(format!("-iptc:source={}", v));
    }

    args
}

/// Values of the tags `names` in `path`, in the order asked.
pub fn read_tags(
    tagger: &dyn Tagger,
    path: &Path,
    names: &[String],
) -> Result<Vec<(String, Option<String>)>, EngineError> {
    names
        .iter()
        .map(|name| Ok((name.clone(), tagger.get_tag(path, name)?)))
        .collect()
}

/// Value from exiftool's `Tag Name   : value` listing (first line only).
pub fn parse_tag_output(output: &str) -> Option<String> {
    let line = output.lines().next()?;
    let (_, value) = line.split_once(':')?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use crate::test_support::{image, Call, RecordingEngine};

    #[test]
    fn test_empty_tags_produce_no_args() {
        let tags = TagsInput {
            caption: Some(String::new()),
            ..Default::default()
        };
        assert!(tag_args(&tags).is_empty());
        assert!(tags.is_empty());
    }

    #[test]
    fn test_tag_args_order_and_duplicates() {
        let tags = TagsInput {
            copyright_notice: Some("© Yale University".to_string()),
            image_credit: Some("Yale Center for British Art".to_string()),
            web_rights_statement: Some("https://example.org/rights".to_string()),
            source: Some("B1977.14.1".to_string()),
            ..Default::default()
        };

        assert_eq!(
            tag_args(&tags),
            vec![
                "-MWG:copyright=© Yale University",
                "-XMP-photoshop:Credit=Yale Center for British Art",
                "-credit=Yale Center for British Art",
                "-xmp:webstatement=https://example.org/rights",
                "-photoshop:URL=https://example.org/rights",
                "-XMP-photoshop:Source=B1977.14.1",
                "-iptc:source=B1977.14.1",
            ]
        );
    }

    #[test]
    fn test_parse_tag_output() {
        assert_eq!(
            parse_tag_output("Copyright                       : Public Domain\n"),
            Some("Public Domain".to_string())
        );
        assert_eq!(
            parse_tag_output("Web Statement: https://example.org/a:b"),
            Some("https://example.org/a:b".to_string())
        );
        assert_eq!(parse_tag_output(""), None);
        assert_eq!(parse_tag_output("Caption :   "), None);
    }

    #[test]
    fn test_read_tags_in_requested_order() {
        let engine = RecordingEngine::new(image(1, 1, "TIFF", "srgb", 8, ""))
            .with_tag("Copyright", "Public Domain");
        let names = vec!["Copyright".to_string(), "Source".to_string()];

        let values = read_tags(&engine, Path::new("/out/a.tif"), &names).unwrap();

        assert_eq!(
            values,
            vec![
                ("Copyright".to_string(), Some("Public Domain".to_string())),
                ("Source".to_string(), None),
            ]
        );
        assert_eq!(
            engine.calls()[0],
            Call::GetTag {
                path: PathBuf::from("/out/a.tif"),
                name: "Copyright".to_string(),
            }
        );
    }

    #[test]
    fn test_read_tags_stops_at_first_failure() {
        let engine = RecordingEngine::new(image(1, 1, "TIFF", "srgb", 8, "")).failing_on("get_tag");
        let names = vec!["Copyright".to_string(), "Source".to_string()];

        assert!(read_tags(&engine, Path::new("/out/a.tif"), &names).is_err());
        assert_eq!(engine.count("get_tag"), 1);
    }
}
