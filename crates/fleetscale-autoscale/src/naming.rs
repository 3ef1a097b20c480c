//! Sequential instance names and scale-down victim selection.
//!
//! Members are named `{prefix}{NN}.{environment}.{region}.{domain}`, matched
//! case-insensitively. `NN` is zero-padded to two digits below 10.

use fleetscale_core::NamingConfig;
use fleetscale_provider::FleetMember;
use regex::Regex;

use crate::error::NamingError;

/// Naming grammar for one provider's fleet.
#[derive(Debug, Clone)]
pub struct FleetNaming {
    naming: NamingConfig,
    pattern: Regex,
}

impl FleetNaming {
    pub fn new(naming: NamingConfig) -> Result<Self, NamingError> {
        let pattern = Regex::new(&format!(
            r"(?i)\A{}(\d{{2,}})\.{}\.{}\.{}\z",
            regex::escape(&naming.prefix),
            regex::escape(&naming.environment),
            regex::escape(&naming.region),
            regex::escape(&naming.domain),
        ))?;
        Ok(Self { naming, pattern })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }

    /// Sequence number of a matching name.
    pub fn sequence_of(&self, name: &str) -> Option<u32> {
        self.pattern
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Full name for sequence number `seq`.
    pub fn name_for(&self, seq: u32) -> String {
        format!(
            "{}{:02}.{}.{}.{}",
            self.naming.prefix, seq, self.naming.environment, self.naming.region, self.naming.domain
        )
    }

    /// Number of names that belong to this fleet.
    pub fn count<I, S>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter(|name| self.matches(name.as_ref()))
            .count()
    }

    /// Members that belong to this fleet.
    pub fn fleet<'a>(&self, members: &'a [FleetMember]) -> impl Iterator<Item = &'a FleetMember> {
        let pattern = self.pattern.clone();
        members.iter().filter(move |m| pattern.is_match(&m.name))
    }

    /// Name for the next member: one past the current match count.
    pub fn next_name<I, S>(&self, existing: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let count = self.count(existing) as u32;
        self.name_for(count + 1)
    }

    /// The member to destroy when shrinking.
    ///
    /// Fails with `CannotScaleDown` once the fleet is at or below
    /// `min_servers`. Otherwise picks the member whose sequence number
    /// equals the match count; if numbering has drifted and no member
    /// carries that number, nothing is selected.
    pub fn select_for_removal<'a>(
        &self,
        existing: &'a [FleetMember],
        min_servers: u32,
    ) -> Result<Option<&'a FleetMember>, NamingError> {
        let count = self.count(existing.iter().map(|m| m.name.as_str()));
        if count <= min_servers as usize {
            return Err(NamingError::CannotScaleDown { count, min_servers });
        }
        let wanted = count as u32;
        Ok(existing
            .iter()
            .rev()
            .find(|m| self.sequence_of(&m.name) == Some(wanted)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naming() -> FleetNaming {
        FleetNaming::new(NamingConfig {
            prefix: "app".to_string(),
            region: "nyc1".to_string(),
            environment: "staging".to_string(),
            domain: "example.com".to_string(),
        })
        .unwrap()
    }

    fn members(names: &[&str]) -> Vec<FleetMember> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| FleetMember::named(format!("{}", 100 + i), *name))
            .collect()
    }

    fn staging(n: u32) -> Vec<FleetMember> {
        let names: Vec<String> = (1..=n)
            .map(|i| format!("app{i:02}.staging.nyc1.example.com"))
            .collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        members(&refs)
    }

    #[test]
    fn next_name_after_two_members() {
        let existing = [
            "app01.staging.nyc1.example.com",
            "app02.staging.nyc1.example.com",
        ];
        assert_eq!(naming().next_name(existing), "app03.staging.nyc1.example.com");
    }

    #[test]
    fn next_name_for_empty_fleet() {
        let none: [&str; 0] = [];
        assert_eq!(naming().next_name(none), "app01.staging.nyc1.example.com");
    }

    #[test]
    fn next_name_ignores_foreign_members() {
        let existing = [
            "app01.staging.nyc1.example.com",
            "app01.production.nyc1.example.com",
            "db01.staging.nyc1.example.com",
            "app02.staging.sfo2.example.com",
        ];
        assert_eq!(naming().next_name(existing), "app02.staging.nyc1.example.com");
    }

    #[test]
    fn padding_stops_at_ten() {
        let n = naming();
        assert_eq!(n.name_for(9), "app09.staging.nyc1.example.com");
        assert_eq!(n.name_for(10), "app10.staging.nyc1.example.com");
        assert_eq!(n.name_for(123), "app123.staging.nyc1.example.com");
    }

    #[test]
    fn next_name_past_nine() {
        let fleet = staging(9);
        let next = naming().next_name(fleet.iter().map(|m| m.name.as_str()));
        assert_eq!(next, "app10.staging.nyc1.example.com");
    }

    #[test]
    fn matching_is_case_insensitive() {
        let n = naming();
        assert!(n.matches("APP04.Staging.NYC1.Example.COM"));
        assert_eq!(n.sequence_of("APP04.Staging.NYC1.Example.COM"), Some(4));
    }

    #[test]
    fn dots_are_literal() {
        assert!(!naming().matches("app01xstagingxnyc1xexamplexcom"));
    }

    #[test]
    fn select_highest_of_three() {
        let fleet = staging(3);
        let victim = naming().select_for_removal(&fleet, 2).unwrap().unwrap();
        assert_eq!(victim.name, "app03.staging.nyc1.example.com");
    }

    #[test]
    fn select_refuses_at_floor() {
        let fleet = staging(2);
        let err = naming().select_for_removal(&fleet, 2).unwrap_err();
        assert!(matches!(
            err,
            NamingError::CannotScaleDown {
                count: 2,
                min_servers: 2
            }
        ));
    }

    #[test]
    fn select_refuses_below_floor() {
        let fleet = staging(1);
        assert!(naming().select_for_removal(&fleet, 2).is_err());
    }

    #[test]
    fn select_with_numbering_gap_selects_nothing() {
        // Three members, but numbered 1, 2, 4: there is no app03.
        let fleet = members(&[
            "app01.staging.nyc1.example.com",
            "app02.staging.nyc1.example.com",
            "app04.staging.nyc1.example.com",
        ]);
        assert!(naming().select_for_removal(&fleet, 2).unwrap().is_none());
    }

    #[test]
    fn fleet_filters_members() {
        let mut all = staging(2);
        all.push(FleetMember::named("999", "bastion.example.com"));
        assert_eq!(naming().fleet(&all).count(), 2);
    }
}
