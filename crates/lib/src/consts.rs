//! Fixed names, URLs and layout constants.

pub const APP_NAME: &str = "v8pack";

/// Name of the library being built, used in release archive names.
pub const LIBRARY_NAME: &str = "v8";

/// Package name passed to depot_tools' `fetch`.
pub const FETCH_PACKAGE: &str = "v8";

pub const DEPOT_TOOLS_ZIP_URL: &str = "https://storage.googleapis.com/chrome-infra/depot_tools.zip";
pub const DEPOT_TOOLS_GIT_URL: &str = "https://chromium.googlesource.com/chromium/tools/depot_tools.git";

pub const TOOLCHAIN_DIR_NAME: &str = "depot_tools";

/// Written into the toolchain directory once it is installed and configured.
pub const TOOLCHAIN_READY_MARKER: &str = ".v8pack-ready";
pub const SOURCE_DIR_NAME: &str = "v8";
pub const BUILD_DIR_NAME: &str = "build";
pub const INCLUDE_DIR_NAME: &str = "include";
pub const RELEASES_DIR_NAME: &str = "releases";

/// gn output directories live under this prefix inside the checkout.
pub const OUT_DIR_PREFIX: &str = "out.gn";

/// Location of the static library inside a gn output directory.
pub const ARTIFACT_SUBDIR: &str = "obj";

/// Version header, relative to the source checkout.
pub const VERSION_HEADER: &str = "include/v8-version.h";

pub const MONOLITH_TARGET: &str = "v8_monolith";
pub const BASE_LIBRARY_STEM: &str = "v8_base_without_compiler";

/// Extension appended to an artifact path to form its fingerprint sidecar.
pub const FINGERPRINT_EXTENSION: &str = "fingerprint";

pub const LOCK_FILENAME: &str = ".v8pack.lock";

pub const CONFIG_FILENAME: &str = "v8pack.toml";

/// Default for `DEPOT_TOOLS_WIN_TOOLCHAIN`: use the locally installed Visual Studio.
pub const DEFAULT_WIN_TOOLCHAIN: &str = "0";

/// Default for `GYP_MSVS_VERSION`.
pub const DEFAULT_MSVS_VERSION: &str = "2022";
