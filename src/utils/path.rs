//! Command-line path handling

use std::path::{Path, PathBuf};

/// Expand a leading `~` (alone or followed by `/`) to the home directory
///
/// `~user` forms and paths without a leading tilde are returned unchanged, as
/// is everything when the home directory cannot be determined.
#[must_use]
pub fn expand_tilde(path: &Path) -> PathBuf {
    expand_tilde_with(path, dirs::home_dir().as_deref())
}

fn expand_tilde_with(path: &Path, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return path.to_path_buf();
    };
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };

    if text == "~" {
        home.to_path_buf()
    } else if let Some(rest) = text.strip_prefix("~/") {
        home.join(rest)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde_variants() {
        let home = Path::new("/home/alex");
        assert_eq!(expand_tilde_with(Path::new("~"), Some(home)), home);
        assert_eq!(
            expand_tilde_with(Path::new("~/Pictures/me.jpg"), Some(home)),
            Path::new("/home/alex/Pictures/me.jpg")
        );
        assert_eq!(
            expand_tilde_with(Path::new("~other/x.png"), Some(home)),
            Path::new("~other/x.png")
        );
        assert_eq!(
            expand_tilde_with(Path::new("/abs/~/x.png"), Some(home)),
            Path::new("/abs/~/x.png")
        );
        assert_eq!(
            expand_tilde_with(Path::new("rel.png"), Some(home)),
            Path::new("rel.png")
        );
    }

    #[test]
    fn test_no_home_leaves_path_untouched() {
        assert_eq!(expand_tilde_with(Path::new("~/a"), None), Path::new("~/a"));
    }
}
