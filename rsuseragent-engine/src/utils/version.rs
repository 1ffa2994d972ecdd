/// 取版本号第一段（主版本）："91.0.4472.124" → "91"
/// 不含 '.' 时原样返回
#[inline(always)]
pub fn first_version_segment(version: &str) -> &str {
    let version = version.trim();
    version.split('.').next().unwrap_or(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_version_segment() {
        assert_eq!(first_version_segment("91.0.4472.124"), "91");
        assert_eq!(first_version_segment("604"), "604");
        assert_eq!(first_version_segment(" 10.15 "), "10");
        assert_eq!(first_version_segment(""), "");
    }
}
