use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::domain::{AccessLevel, AccessRecord, RiskLevel, User};
use crate::engine::AccountClassifier;
use crate::error::Result;

const NO_ACCESS: &str = "No Access";

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Classification labels: configured rules first, then any others seen.
fn classifications<'a>(
    records: &'a [AccessRecord],
    classifier: &'a AccountClassifier,
) -> Vec<&'a str> {
    let mut labels = classifier.labels();
    for record in records.iter().filter(|r| !r.is_placeholder()) {
        let label = record.account.classification.as_str();
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// One row per user: the highest access held in each classification.
pub fn user_analysis_csv(
    records: &[AccessRecord],
    classifier: &AccountClassifier,
) -> Result<String> {
    let labels = classifications(records, classifier);

    // Keyed by user id: display names are not unique.
    let mut order: Vec<&User> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut highest: HashMap<(&str, &str), AccessLevel> = HashMap::new();
    for record in records {
        let user_id = record.user.id.as_str();
        if seen.insert(user_id) {
            order.push(&record.user);
        }
        if record.is_placeholder() {
            continue;
        }
        let level = record.effective_access();
        let entry = highest
            .entry((user_id, record.account.classification.as_str()))
            .or_insert(level);
        *entry = (*entry).max(level);
    }

    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["User", "Email"];
    header.extend(labels.iter().copied());
    wtr.write_record(&header)?;

    for user in order {
        let mut row = vec![user.name().to_string(), user.email.clone()];
        for label in &labels {
            row.push(match highest.get(&(user.id.as_str(), *label)) {
                Some(level) if *level > AccessLevel::Unknown => level.to_string(),
                Some(AccessLevel::Unknown) => AccessLevel::Unknown.to_string(),
                _ => NO_ACCESS.to_string(),
            });
        }
        wtr.write_record(&row)?;
    }

    finish(wtr)
}

#[derive(Default)]
struct AccountTally<'a> {
    name: &'a str,
    classification: &'a str,
    users: HashSet<&'a str>,
    admin: BTreeSet<&'a str>,
    read_write: BTreeSet<&'a str>,
    read_only: BTreeSet<&'a str>,
}

/// One row per account: distinct users and their emails by access level.
pub fn account_analysis_csv(records: &[AccessRecord]) -> Result<String> {
    let mut accounts: BTreeMap<&str, AccountTally<'_>> = BTreeMap::new();
    for record in records.iter().filter(|r| !r.is_placeholder()) {
        let tally = accounts
            .entry(record.account.id.as_str())
            .or_insert_with(|| AccountTally {
                name: &record.account.name,
                classification: &record.account.classification,
                ..AccountTally::default()
            });
        tally.users.insert(record.user.id.as_str());
        let email = record.user.email.as_str();
        match record.effective_access() {
            AccessLevel::FullAdmin => {
                tally.admin.insert(email);
            }
            AccessLevel::ReadWrite => {
                tally.read_write.insert(email);
            }
            AccessLevel::ReadOnly => {
                tally.read_only.insert(email);
            }
            AccessLevel::Unknown | AccessLevel::NoAccess => {}
        }
    }

    let mut rows: Vec<(&str, &AccountTally<'_>)> =
        accounts.iter().map(|(id, t)| (*id, t)).collect();
    rows.sort_by(|a, b| a.1.name.cmp(b.1.name).then(a.0.cmp(b.0)));

    let join = |set: &BTreeSet<&str>| set.iter().copied().collect::<Vec<_>>().join("; ");

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "Account Name",
        "Account ID",
        "Classification",
        "User Count",
        "Admin Emails",
        "Read Write Emails",
        "Read Only Emails",
    ])?;
    for (id, tally) in rows {
        wtr.write_record([
            tally.name.to_string(),
            id.to_string(),
            tally.classification.to_string(),
            tally.users.len().to_string(),
            join(&tally.admin),
            join(&tally.read_write),
            join(&tally.read_only),
        ])?;
    }

    finish(wtr)
}

/// One row per classification: account and user counts, admins, and users
/// holding a role at high or critical risk.
pub fn risk_analysis_csv(
    records: &[AccessRecord],
    classifier: &AccountClassifier,
) -> Result<String> {
    let labels = classifications(records, classifier);

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "Classification",
        "Total Accounts",
        "Total Users",
        "Admin Users",
        "High Risk Users",
        "Critical Risk Users",
    ])?;

    for label in labels {
        let mut accounts = HashSet::new();
        let mut users = HashSet::new();
        let mut admins = HashSet::new();
        let mut high = HashSet::new();
        let mut critical = HashSet::new();
        for record in records
            .iter()
            .filter(|r| !r.is_placeholder() && r.account.classification == label)
        {
            let user = record.user.id.as_str();
            accounts.insert(record.account.id.as_str());
            users.insert(user);
            if record.effective_access() == AccessLevel::FullAdmin {
                admins.insert(user);
            }
            let risk = record.role.risk_level();
            if risk >= RiskLevel::High {
                high.insert(user);
            }
            if risk == RiskLevel::Critical {
                critical.insert(user);
            }
        }
        wtr.write_record([
            label.to_string(),
            accounts.len().to_string(),
            users.len().to_string(),
            admins.len().to_string(),
            high.len().to_string(),
            critical.len().to_string(),
        ])?;
    }

    finish(wtr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClassificationConfig, ClassificationRule};
    use crate::domain::{Account, AssignmentType, PermissionScores, Role, UserStatus};

    fn classifier() -> AccountClassifier {
        AccountClassifier::new(&ClassificationConfig {
            rules: vec![
                ClassificationRule {
                    name: "Production".to_string(),
                    include: vec!["prod".to_string()],
                    exclude: vec![],
                },
                ClassificationRule {
                    name: "Development".to_string(),
                    include: vec!["dev".to_string()],
                    exclude: vec![],
                },
            ],
            ..ClassificationConfig::default()
        })
    }

    fn record(
        user: &str,
        account: &str,
        classification: &str,
        level: AccessLevel,
        scores: (u32, u32, u32),
    ) -> AccessRecord {
        AccessRecord {
            user: User {
                id: user.to_string(),
                username: user.to_string(),
                email: format!("{user}@example.com"),
                status: UserStatus::Enabled,
                ..User::default()
            },
            account: Account {
                id: format!("id-{account}"),
                name: account.to_string(),
                classification: classification.to_string(),
            },
            role: Role {
                name: "ps".to_string(),
                arn: "arn:ps".to_string(),
                access_level: level,
                scores: PermissionScores::new(scores.0, scores.1, scores.2),
            },
            responsible_group: "DIRECT".to_string(),
            assignment_type: AssignmentType::User,
        }
    }

    fn records() -> Vec<AccessRecord> {
        vec![
            record("alice", "prod-a", "Production", AccessLevel::ReadOnly, (8, 0, 0)),
            record("alice", "prod-b", "Production", AccessLevel::FullAdmin, (10, 10, 10)),
            record("bob", "dev-a", "Development", AccessLevel::ReadWrite, (5, 8, 0)),
            AccessRecord::unassigned(User {
                id: "carol".to_string(),
                username: "carol".to_string(),
                email: "N/A".to_string(),
                ..User::default()
            }),
        ]
    }

    #[test]
    fn test_user_analysis_highest_access() {
        let csv = user_analysis_csv(&records(), &classifier()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "User,Email,Production,Development,Unclassified");
        assert_eq!(lines[1], "alice,alice@example.com,Admin,No Access,No Access");
        assert_eq!(lines[2], "bob,bob@example.com,No Access,Read Write,No Access");
        assert_eq!(lines[3], "carol,N/A,No Access,No Access,No Access");
    }

    #[test]
    fn test_user_analysis_keeps_users_sharing_a_display_name() {
        let mut first = record(
            "u-1",
            "prod-a",
            "Production",
            AccessLevel::FullAdmin,
            (10, 10, 10),
        );
        first.user.display_name = Some("Jane Doe".to_string());
        first.user.email = "jane1@example.com".to_string();
        let mut second = record(
            "u-2",
            "dev-a",
            "Development",
            AccessLevel::ReadOnly,
            (8, 0, 0),
        );
        second.user.display_name = Some("Jane Doe".to_string());
        second.user.email = "jane2@example.com".to_string();

        let csv = user_analysis_csv(&[first, second], &classifier()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "Jane Doe,jane1@example.com,Admin,No Access,No Access");
        assert_eq!(lines[2], "Jane Doe,jane2@example.com,No Access,Read Only,No Access");
    }

    #[test]
    fn test_account_analysis_rows() {
        let csv = account_analysis_csv(&records()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "dev-a,id-dev-a,Development,1,,bob@example.com,");
        assert_eq!(lines[2], "prod-a,id-prod-a,Production,1,,,alice@example.com");
        assert_eq!(lines[3], "prod-b,id-prod-b,Production,1,alice@example.com,,");
    }

    #[test]
    fn test_risk_analysis_per_classification() {
        let csv = risk_analysis_csv(&records(), &classifier()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "Production,2,1,1,1,1");
        assert_eq!(lines[2], "Development,1,1,0,1,0");
        assert_eq!(lines[3], "Unclassified,0,0,0,0,0");
    }
}
