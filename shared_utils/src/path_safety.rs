
use std::borrow::Cow;
use std::path::Path;

/// Sanitizes a file path for command-line usage by tools that do not accept
/// `--` as an option terminator (vips, vipsthumbnail, tiffcp).
///
/// Ensures the path starts with either '/' (absolute) or a non-dash character,
/// preventing it from being misinterpreted as a flag if it starts with '-'.
pub fn safe_path_arg(path: &Path) -> Cow<'_, str> {
    let s = path.to_string_lossy();
    if s.starts_with('-') {
        Cow::Owned(format!("./{}", s))
    } else {
        s
    }
}

/// Path argument selecting the first frame/page of a multi-image file
/// (`input.tif[0]`), the syntax shared by libvips and ImageMagick.
pub fn first_frame_arg(path: &Path) -> String {
    format!("{}[0]", safe_path_arg(path))
}

/// Path argument with libvips save options appended
/// (`out.tif[compression=none,strip]`).
pub fn with_save_options(path: &Path, options: &str) -> String {
    if options.is_empty() {
        safe_path_arg(path).into_owned()
    } else {
        format!("{}[{}]", safe_path_arg(path), options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_path_arg() {
        assert_eq!(safe_path_arg(Path::new("normal.tif")), "normal.tif");
        assert_eq!(safe_path_arg(Path::new("/abs/path.tif")), "/abs/path.tif");
        assert_eq!(safe_path_arg(Path::new("-dash.tif")), "./-dash.tif");
        assert_eq!(safe_path_arg(Path::new("-dir/file.tif")), "./-dir/file.tif");
    }

    #[test]
    fn test_first_frame_arg() {
        assert_eq!(first_frame_arg(Path::new("/in/a.jpg")), "/in/a.jpg[0]");
        assert_eq!(first_frame_arg(Path::new("-a.gif")), "./-a.gif[0]");
    }

    #[test]
    fn test_with_save_options() {
        assert_eq!(
            with_save_options(Path::new("/w/a.tif"), "compression=none,strip"),
            "/w/a.tif[compression=none,strip]"
        );
        assert_eq!(with_save_options(Path::new("/w/a.tif"), ""), "/w/a.tif");
    }
}
