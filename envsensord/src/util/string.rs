//
// Copyright (c) Memfault, Inc.
// See License.txt for details
/// Strip C-style `/* */` comments from a configuration file.
///
/// An unterminated comment is kept as-is, letting the JSON parser report it.
pub fn remove_comments(config_string: &str) -> String {
    let mut output = String::with_capacity(config_string.len());
    let mut rest = config_string;
    while let Some((before, after)) = rest.split_once("/*") {
        match after.split_once("*/") {
            Some((_, remaining)) => {
                output.push_str(before);
                rest = remaining;
            }
            None => break,
        }
    }
    output.push_str(rest);
    output
}
