//! Default values shared by the configuration layers.

use crate::logging::LogFormat;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// URL scheme identifying drivers shipped in the boot image.
pub const DEFAULT_BOOT_SCHEME: &str = "fuchsia-boot://";

/// Component URL launched for every new driver host.
pub const DEFAULT_DRIVER_HOST_URL: &str = "#meta/driver_host2.cm";

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Owned boot scheme used by serde when the field is absent.
#[must_use]
pub fn default_boot_scheme() -> String {
    DEFAULT_BOOT_SCHEME.to_owned()
}

/// Owned driver host URL used by serde when the field is absent.
#[must_use]
pub fn default_driver_host_url() -> String {
    DEFAULT_DRIVER_HOST_URL.to_owned()
}
