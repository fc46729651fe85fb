//! Host-wide name/value registry (spec.md §6 table) and argv capture/
//! reconstruction (spec.md §3 "Argv capture").
//!
//! Values are never written into the *current* process's environment — see
//! SPEC_FULL.md §9.2 — only read from it (role detection, argv
//! reconstruction, already-bound peer pid) and written into a *child's*
//! environment via [`std::process::Command::envs`]. Every function that reads
//! is generic over a lookup closure so it can be exercised without touching
//! the real process environment.

use std::env;

/// `PROCESS_ROLE` value that marks a process as the sentinel.
const ROLE_SENTINEL_VALUE: &str = "watchdog";

/// Recognized environment keys (spec.md §6 table).
pub const KEY_PROCESS_ROLE: &str = "PROCESS_ROLE";
pub const KEY_APP_PID: &str = "APP_PID";
pub const KEY_SENTINEL_PID: &str = "SENTINEL_PID";
pub const KEY_APP_ARG_COUNT: &str = "APP_ARG_COUNT";

/// Reconstruction limit (spec.md §6): a valid argv count must be strictly
/// less than this — `examples/original_source/watchdog/watchdog.c`'s own
/// guard is `arg_count > 0 && arg_count < 100`, and spec.md's testable
/// properties (§8 property 5) promise the round-trip only "for any
/// application argv of length ≤ 99," never at exactly 100.
pub const MAX_ARGV: usize = 100;

/// Role inferred from `PROCESS_ROLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    App,
    Sentinel,
}

/// i-th preserved application argument's env key.
#[must_use]
pub fn app_arg_key(index: usize) -> String {
    format!("APP_ARG_{index}")
}

/// Detect this process's role from a lookup function over env keys.
pub fn detect_role_with<F>(lookup: F) -> Role
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(KEY_PROCESS_ROLE) {
        Some(v) if v == ROLE_SENTINEL_VALUE => Role::Sentinel,
        _ => Role::App,
    }
}

/// Detect this process's role from its real environment.
#[must_use]
pub fn detect_role() -> Role {
    detect_role_with(|k| env::var(k).ok())
}

/// Read a required peer pid (e.g. `APP_PID` from the sentinel's point of
/// view) via a lookup function.
pub fn read_peer_pid_with<F>(key: &str, lookup: F) -> Option<i32>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.parse().ok())
}

/// Read a required peer pid from the real environment.
#[must_use]
pub fn read_peer_pid(key: &str) -> Option<i32> {
    read_peer_pid_with(key, |k| env::var(k).ok())
}

/// Build the `(key, value)` pairs a spawned child's environment needs to
/// preserve the application's original argv, ready for
/// [`std::process::Command::envs`].
///
/// Returns `None` if `argv.len() >= MAX_ARGV` (the capture side of the same
/// limit spec.md §6 places on reconstruction).
#[must_use]
pub fn capture_argv_env(argv: &[String]) -> Option<Vec<(String, String)>> {
    if argv.len() >= MAX_ARGV {
        return None;
    }
    let mut pairs = Vec::with_capacity(argv.len() + 1);
    pairs.push((KEY_APP_ARG_COUNT.to_owned(), argv.len().to_string()));
    for (i, arg) in argv.iter().enumerate() {
        pairs.push((app_arg_key(i), arg.clone()));
    }
    Some(pairs)
}

/// Reconstruct the application's original argv from a lookup function.
///
/// Returns `None` if the count is missing/unparsable, reaches [`MAX_ARGV`],
/// or any individual slot `0..count` is missing — matching spec.md §4.2 step
/// 3's "if any slot is missing, fall through to a default command vector."
pub fn reconstruct_argv_with<F>(lookup: F) -> Option<Vec<String>>
where
    F: Fn(&str) -> Option<String>,
{
    let count: usize = lookup(KEY_APP_ARG_COUNT)?.parse().ok()?;
    if count >= MAX_ARGV {
        return None;
    }

    let mut argv = Vec::with_capacity(count);
    for i in 0..count {
        argv.push(lookup(&app_arg_key(i))?);
    }
    Some(argv)
}

/// Reconstruct the application's original argv from the real environment.
#[must_use]
pub fn reconstruct_argv() -> Option<Vec<String>> {
    reconstruct_argv_with(|k| env::var(k).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(map: &HashMap<&str, &str>) -> impl Fn(&str) -> Option<String> + '_ {
        move |k| map.get(k).map(|v| (*v).to_owned())
    }

    #[test]
    fn detects_sentinel_role() {
        let mut map = HashMap::new();
        map.insert(KEY_PROCESS_ROLE, "watchdog");
        assert_eq!(detect_role_with(lookup_from(&map)), Role::Sentinel);
    }

    #[test]
    fn unset_or_other_role_is_app() {
        let map = HashMap::new();
        assert_eq!(detect_role_with(lookup_from(&map)), Role::App);

        let mut map2 = HashMap::new();
        map2.insert(KEY_PROCESS_ROLE, "something-else");
        assert_eq!(detect_role_with(lookup_from(&map2)), Role::App);
    }

    #[test]
    fn argv_round_trips_through_env_pairs() {
        let original = vec![
            "app".to_owned(),
            "--flag".to_owned(),
            "value with spaces".to_owned(),
        ];
        let pairs = capture_argv_env(&original).expect("within limit");

        let map: HashMap<&str, &str> = pairs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let reconstructed = reconstruct_argv_with(lookup_from(&map)).expect("all slots present");
        assert_eq!(reconstructed, original);
    }

    #[test]
    fn capture_accepts_argv_one_below_the_limit() {
        let max_valid: Vec<String> = (0..MAX_ARGV - 1).map(|i| i.to_string()).collect();
        assert!(capture_argv_env(&max_valid).is_some());
    }

    #[test]
    fn capture_rejects_argv_at_or_over_the_limit() {
        let at_limit: Vec<String> = (0..MAX_ARGV).map(|i| i.to_string()).collect();
        assert!(capture_argv_env(&at_limit).is_none());

        let over_limit: Vec<String> = (0..MAX_ARGV + 1).map(|i| i.to_string()).collect();
        assert!(capture_argv_env(&over_limit).is_none());
    }

    #[test]
    fn reconstruct_fails_closed_on_missing_slot() {
        let mut map = HashMap::new();
        map.insert(KEY_APP_ARG_COUNT, "3");
        map.insert("APP_ARG_0", "app");
        map.insert("APP_ARG_1", "--flag");
        // APP_ARG_2 missing.
        assert!(reconstruct_argv_with(lookup_from(&map)).is_none());
    }

    #[test]
    fn reconstruct_fails_closed_on_unparsable_count() {
        let mut map = HashMap::new();
        map.insert(KEY_APP_ARG_COUNT, "not-a-number");
        assert!(reconstruct_argv_with(lookup_from(&map)).is_none());
    }

    #[test]
    fn reconstruct_fails_closed_at_the_limit() {
        // `MAX_ARGV` itself is not a valid count — spec.md §8 property 5
        // promises the round-trip only up to length 99.
        let mut map = HashMap::new();
        map.insert(KEY_APP_ARG_COUNT, "100");
        assert!(reconstruct_argv_with(lookup_from(&map)).is_none());
    }

    #[test]
    fn reconstruct_fails_closed_over_limit() {
        let mut map = HashMap::new();
        map.insert(KEY_APP_ARG_COUNT, "101");
        assert!(reconstruct_argv_with(lookup_from(&map)).is_none());
    }

    #[test]
    fn reconstruct_handles_zero_argv() {
        let mut map = HashMap::new();
        map.insert(KEY_APP_ARG_COUNT, "0");
        assert_eq!(reconstruct_argv_with(lookup_from(&map)), Some(Vec::new()));
    }

    #[test]
    fn read_peer_pid_parses_valid_value() {
        let mut map = HashMap::new();
        map.insert(KEY_SENTINEL_PID, "4242");
        assert_eq!(
            read_peer_pid_with(KEY_SENTINEL_PID, lookup_from(&map)),
            Some(4242)
        );
    }

    #[test]
    fn read_peer_pid_none_when_absent_or_invalid() {
        let map = HashMap::new();
        assert_eq!(read_peer_pid_with(KEY_APP_PID, lookup_from(&map)), None);

        let mut map2 = HashMap::new();
        map2.insert(KEY_APP_PID, "not-a-pid");
        assert_eq!(read_peer_pid_with(KEY_APP_PID, lookup_from(&map2)), None);
    }
}
