//
// Copyright (c) Memfault, Inc.
// See License.txt for details

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn format_version() -> String {
    format!("VERSION={}", VERSION)
}
