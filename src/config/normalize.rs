//! Interface-name normalization.
//!
//! `interface <name>` lines abbreviate the interface family
//! (`gi0/0`, `fa0/1`, `se0/0/0`, ...). Normalization expands the
//! recognized prefix to its canonical family name and keeps the
//! remaining suffix (slot/port numbering) verbatim.

/// Longest-alias-first so that e.g. `gigabitethernet` itself matches
/// before the short `gi` alias would otherwise consume only part of it.
const FAMILIES: &[(&str, &[&str])] = &[
    (
        "GigabitEthernet",
        &["gigabitethernet", "gigabiteth", "gig", "gi"],
    ),
    ("FastEthernet", &["fastethernet", "fastether", "fast", "fa"]),
    ("Ethernet", &["ethernet", "eth", "et"]),
    ("Serial", &["serial", "se"]),
    ("Loopback", &["loopback", "loop", "lo"]),
    ("Vlan", &["vlan", "vl"]),
    ("Tunnel", &["tunnel", "tun"]),
    ("Port-channel", &["portchannel", "port-channel", "po"]),
];

/// Normalize a raw interface name to its canonical form.
///
/// Matching is case-insensitive prefix matching against the known
/// family table, trying the longest alias of each family first so an
/// abbreviation like `gi0/0` expands to `GigabitEthernet0/0` rather
/// than being left unmatched because the full word wins first. Any
/// name that matches no known family is returned unchanged (Cisco
/// software has many families beyond the recognized subset; §4.1
/// scopes the parser to a documented subset only).
pub fn normalize_interface_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();

    let mut best: Option<(&'static str, &'static str)> = None;
    for (canonical, aliases) in FAMILIES {
        for alias in *aliases {
            if lower.starts_with(alias) {
                let is_better = match best {
                    None => true,
                    Some((_, prev_alias)) => alias.len() > prev_alias.len(),
                };
                if is_better {
                    best = Some((canonical, alias));
                }
                break;
            }
        }
    }

    match best {
        Some((canonical, alias)) => {
            let suffix = &trimmed[alias.len().min(trimmed.len())..];
            format!("{canonical}{suffix}")
        }
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn expands_known_abbreviations() {
        assert_eq!(normalize_interface_name("gi0/0"), "GigabitEthernet0/0");
        assert_eq!(normalize_interface_name("Gi0/1"), "GigabitEthernet0/1");
        assert_eq!(normalize_interface_name("fa0/0"), "FastEthernet0/0");
        assert_eq!(normalize_interface_name("se0/0/0"), "Serial0/0/0");
        assert_eq!(normalize_interface_name("lo0"), "Loopback0");
        assert_eq!(normalize_interface_name("vl10"), "Vlan10");
        assert_eq!(normalize_interface_name("po1"), "Port-channel1");
    }

    #[test]
    fn passes_through_full_names() {
        assert_eq!(
            normalize_interface_name("GigabitEthernet0/0"),
            "GigabitEthernet0/0"
        );
    }

    #[test]
    fn unknown_family_is_unchanged() {
        assert_eq!(normalize_interface_name("Dialer1"), "Dialer1");
    }
}
