//! Default filesystem locations used when the configuration omits them

pub const DESTINATION_DIR: &str = "/var/lib/pkgfetch/packages";

pub const TRUSTED_PRIMARY_KEY: &str = "/etc/pkgfetch/trusted.pub";
pub const TRUSTED_KEYS_DIR: &str = "/etc/pkgfetch/trusted.d";

pub const CONFIG_FILE_NAME: &str = "config.toml";
