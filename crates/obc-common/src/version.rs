//! ---
//! obc_section: "01-common"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Build metadata for CLI version output."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// Workspace semantic version.
    pub semver: String,
    /// `<arch>-<os>` of the running binary.
    pub platform: String,
    /// Cargo profile family (`debug` or `release`).
    pub profile: String,
}

impl VersionInfo {
    #[must_use]
    pub fn current() -> Self {
        Self {
            semver: env!("CARGO_PKG_VERSION").to_owned(),
            platform: format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS),
            profile: if cfg!(debug_assertions) {
                "debug".to_owned()
            } else {
                "release".to_owned()
            },
        }
    }

    #[must_use]
    pub fn banner(&self) -> String {
        format!("OBC fault diagnosis v{}", self.semver)
    }

    /// Multi-line string printed by `-V`.
    #[must_use]
    pub fn extended(&self) -> String {
        format!(
            "{banner}\nPlatform: {platform}\nProfile: {profile}",
            banner = self.banner(),
            platform = self.platform,
            profile = self.profile
        )
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.semver)
    }
}
