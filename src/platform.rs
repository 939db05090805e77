//! OS-identification is explicitly out of core scope (SPEC_FULL.md §1): the
//! host platform only matters for which built-in macros are predefined at
//! startup, so it is resolved once here with `cfg!` and fed into
//! `Config::predefined` like any other `-D` flag.

/// `NAME=value` entries (the same shape `-D` produces) for the macros this
/// host should have predefined. Non-Windows hosts contribute nothing.
pub fn platform_macros() -> Vec<String> {
    let mut macros = Vec::new();
    if cfg!(windows) {
        macros.push("_WIN32=1".to_string());
        if cfg!(target_pointer_width = "64") {
            macros.push("_WIN64=1".to_string());
        }
    }
    macros
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_windows_hosts_add_no_platform_macros() {
        if !cfg!(windows) {
            assert!(platform_macros().is_empty());
        }
    }
}
