//! Argument builder for ripgrep invocations.
//!
//! Turns a `SearchInputs` snapshot into an argument list, refusing any user
//! flag on the operation's blacklist before anything is spawned.

use crate::config::ColorScheme;
use crate::error::EngineError;
use crate::types::SearchInputs;

const MULTILINE_FLAGS: &[&str] = &["-U", "--multiline", "--multiline-dotall"];

/// Short flags whose value may be attached in a cluster, as in `-m1` or `-iC3`.
const SHORT_VALUE_FLAGS: &[char] = &[
    'A', 'B', 'C', 'E', 'M', 'T', 'd', 'e', 'f', 'g', 'j', 'm', 'r', 't',
];

/// Split a paths string on whitespace. `\ ` is a literal space.
pub fn split_paths(paths: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut chars = paths.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&' ') {
            current.push(' ');
            chars.next();
        } else if c.is_whitespace() {
            if !current.is_empty() {
                result.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        result.push(current);
    }
    result
}

/// Split the raw flags string into independent tokens.
pub fn split_flags(flags: &str) -> Vec<String> {
    flags.split_whitespace().map(str::to_string).collect()
}

fn is_short_flag(flag: &str) -> bool {
    flag.len() == 2 && flag.starts_with('-') && !flag.starts_with("--")
}

/// Whether `token` is `flag` itself or `flag` carrying a value
/// (`--flag=value`, or `-xVALUE` for short flags).
fn matches_flag(token: &str, flag: &str) -> bool {
    match token.strip_prefix(flag) {
        Some("") => true,
        Some(rest) => rest.starts_with('=') || is_short_flag(flag),
        None => false,
    }
}

/// Short flags set by a `-xyz` cluster, up to and including the first one
/// that takes a value (the rest of the token is that value).
fn cluster_flags(token: &str) -> Vec<char> {
    let cluster = match token.strip_prefix('-') {
        Some(cluster) if !cluster.starts_with('-') => cluster,
        _ => return Vec::new(),
    };

    let mut flags = Vec::new();
    for c in cluster.chars() {
        if !c.is_ascii_alphanumeric() {
            break;
        }
        flags.push(c);
        if SHORT_VALUE_FLAGS.contains(&c) {
            break;
        }
    }
    flags
}

fn is_blacklisted(token: &str, blacklist: &[String]) -> bool {
    blacklist.iter().any(|flag| matches_flag(token, flag))
        || cluster_flags(token)
            .into_iter()
            .any(|c| blacklist.iter().any(|flag| *flag == format!("-{}", c)))
}

/// Every token of `flags` that hits the blacklist, in input order.
pub fn find_blacklisted(flags: &[String], blacklist: &[String]) -> Vec<String> {
    flags
        .iter()
        .filter(|token| is_blacklisted(token, blacklist))
        .cloned()
        .collect()
}

/// Build the argument list for `inputs`.
///
/// Returns `Ok(None)` when the search text is empty. `extra_args` are the
/// caller's configured arguments and `engine_args` the ones the engine
/// injects for the operation; both go before the paths.
pub fn build_args(
    inputs: &SearchInputs,
    blacklist: &[String],
    extra_args: &[String],
    engine_args: &[String],
) -> Result<Option<Vec<String>>, EngineError> {
    let mut args = pattern_args(inputs, blacklist)?;
    if args.is_empty() {
        return Ok(None);
    }

    for glob in inputs
        .files_filter
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
    {
        args.push(format!("--glob={}", glob));
    }

    args.extend(extra_args.iter().cloned());
    args.extend(engine_args.iter().cloned());

    let paths = split_paths(&inputs.paths);
    if !paths.is_empty() {
        args.push("--".to_string());
        args.extend(paths);
    }

    Ok(Some(args))
}

/// Flags, pattern and replacement, validated against `blacklist`.
/// Empty when there is nothing to search for.
fn pattern_args(inputs: &SearchInputs, blacklist: &[String]) -> Result<Vec<String>, EngineError> {
    let flags = split_flags(&inputs.flags);
    let rejected = find_blacklisted(&flags, blacklist);
    if !rejected.is_empty() {
        log::warn!("Refusing blacklisted flags: {:?}", rejected);
        return Err(EngineError::InvalidArguments { flags: rejected });
    }

    if inputs.search.is_empty() {
        return Ok(Vec::new());
    }

    let mut args = flags;
    args.push(format!("--regexp={}", inputs.search));
    if !inputs.replacement.is_empty() {
        args.push(format!("--replace={}", inputs.replacement));
    }
    Ok(args)
}

/// Arguments rewriting one file: the file's full content is printed with
/// every match replaced. The file path is appended by the caller after `--`.
pub fn build_rewrite_args(
    inputs: &SearchInputs,
    blacklist: &[String],
    extra_args: &[String],
) -> Result<Option<Vec<String>>, EngineError> {
    let mut args = pattern_args(inputs, blacklist)?;
    if args.is_empty() {
        return Ok(None);
    }
    if replacement_arg(&args).is_none() {
        args.push("--replace=".to_string());
    }
    args.extend(extra_args.iter().cloned());
    args.extend(
        [
            "--passthru",
            // Binary content is passed through instead of a notice
            "--text",
            "--color=never",
            "--no-heading",
            "--no-filename",
            "--no-line-number",
            "--no-column",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    Ok(Some(args))
}

/// Arguments injected for a search: colour markers the parser keys on plus
/// one record per matching line.
pub fn search_engine_args(colors: &ColorScheme) -> Vec<String> {
    let mut args = vec!["--color=ansi".to_string()];
    for (category, color) in [
        ("path", colors.path),
        ("line", colors.line),
        ("column", colors.column),
        ("match", colors.match_color),
    ] {
        args.push(format!("--colors={}:none", category));
        args.push(format!("--colors={}:fg:{}", category, color.name()));
    }
    args.extend(
        ["--no-heading", "--with-filename", "--line-number", "--column"]
            .iter()
            .map(|s| s.to_string()),
    );
    args
}

/// Arguments injected for the candidate file enumeration.
pub fn files_engine_args() -> Vec<String> {
    vec!["--files-with-matches".to_string(), "--color=never".to_string()]
}

/// Value of the replacement argument, if any.
pub fn replacement_arg(args: &[String]) -> Option<&str> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(value) = arg.strip_prefix("--replace=") {
            return Some(value);
        }
        if arg == "--replace" || arg == "-r" {
            return iter.next().map(String::as_str);
        }
        if arg == "--" {
            break;
        }
    }
    None
}

/// True when a replace would delete every match.
pub fn replaces_with_empty(args: &[String]) -> bool {
    replacement_arg(args).map_or(true, str::is_empty)
}

/// True when the arguments turn on multiline searching.
pub fn is_multiline(args: &[String]) -> bool {
    args.iter().take_while(|a| a.as_str() != "--").any(|arg| {
        // Clustered short flags such as `-iU`
        MULTILINE_FLAGS.contains(&arg.as_str()) || cluster_flags(arg).contains(&'U')
    })
}
