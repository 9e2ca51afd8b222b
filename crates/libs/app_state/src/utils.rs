use std::path::Path;

/// `path` relative to `base`, with forward slashes on every platform.
///
/// `None` if `path` isn't below `base`.
#[must_use]
pub fn relative_posix(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    Some(relative.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_folders_use_forward_slashes() {
        let base = Path::new("/data/ada@example.org");
        assert_eq!(
            relative_posix(&base.join("run_1").join("lane_2"), base).as_deref(),
            Some("run_1/lane_2")
        );
        assert_eq!(relative_posix(Path::new("/elsewhere"), base), None);
    }
}
