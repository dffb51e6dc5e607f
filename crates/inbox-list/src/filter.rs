use std::collections::HashMap;

use inbox_types::Message;

/// Narrow `all` to the messages matching `query`, preserving order.
///
/// A blank query returns everything. Otherwise a message is kept when its
/// sender, the sender's remark, or its content contains the trimmed query,
/// ignoring case.
pub fn filter<M>(all: &[M], remarks: &HashMap<String, String>, query: &str) -> Vec<M>
where
    M: AsRef<Message> + Clone,
{
    let query = query.trim();
    if query.is_empty() {
        return all.to_vec();
    }

    let needle = query.to_lowercase();
    all.iter()
        .filter(|m| matches_lowered(m.as_ref(), remarks, &needle))
        .cloned()
        .collect()
}

/// Single-message form of [`filter`].
pub fn matches(message: &Message, remarks: &HashMap<String, String>, query: &str) -> bool {
    let query = query.trim();
    query.is_empty() || matches_lowered(message, remarks, &query.to_lowercase())
}

fn matches_lowered(message: &Message, remarks: &HashMap<String, String>, needle: &str) -> bool {
    contains_folded(&message.user_name, needle)
        || remarks
            .get(&message.user_name)
            .is_some_and(|remark| contains_folded(remark, needle))
        || contains_folded(&message.content, needle)
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::IndexedRandom;
    use rand::{Rng, SeedableRng};

    fn inbox() -> Vec<Message> {
        vec![
            Message::text("Alice", "meeting at 5", "09:00"),
            Message::text("Bob", "Lunch?", "10:00"),
            Message::text("Carol", "Boss wants the report", "11:00"),
            Message::text("Dave", "see you at the MEETING", "12:00"),
        ]
    }

    fn remarks() -> HashMap<String, String> {
        HashMap::from([("Alice".to_string(), "Boss".to_string())])
    }

    #[test]
    fn blank_query_returns_everything_in_order() {
        let all = inbox();
        assert_eq!(filter(&all, &remarks(), ""), all);
        assert_eq!(filter(&all, &remarks(), "   "), all);
    }

    #[test]
    fn remark_match_counts() {
        let hits = filter(&inbox(), &remarks(), "boss");
        let users: Vec<&str> = hits.iter().map(|m| m.user_name.as_str()).collect();
        // Alice via remark, Carol via content
        assert_eq!(users, vec!["Alice", "Carol"]);
    }

    #[test]
    fn content_match_ignores_case_and_keeps_order() {
        let hits = filter(&inbox(), &HashMap::new(), "  Meeting ");
        let users: Vec<&str> = hits.iter().map(|m| m.user_name.as_str()).collect();
        assert_eq!(users, vec!["Alice", "Dave"]);
    }

    #[test]
    fn name_match() {
        let hits = filter(&inbox(), &HashMap::new(), "BO");
        let users: Vec<&str> = hits.iter().map(|m| m.user_name.as_str()).collect();
        assert_eq!(users, vec!["Bob", "Carol"]);
    }

    #[test]
    fn no_match_yields_empty() {
        assert!(filter(&inbox(), &remarks(), "zzz").is_empty());
    }

    #[test]
    fn non_ascii_case_folding() {
        let all = vec![Message::text("Ærøskøbing", "ÉTÉ", "t")];
        assert_eq!(filter(&all, &HashMap::new(), "ærø").len(), 1);
        assert_eq!(filter(&all, &HashMap::new(), "été").len(), 1);
    }

    #[test]
    fn kept_and_dropped_partition_by_match() {
        let mut rng = StdRng::seed_from_u64(7);
        let alphabet = ["a", "B", "c", "ab", "Ca", " "];
        let word = |rng: &mut StdRng| -> String {
            (0..rng.random_range(0..5))
                .map(|_| *alphabet.choose(rng).unwrap())
                .collect()
        };

        for _ in 0..200 {
            let all: Vec<Message> = (0..8)
                .map(|i| Message::text(word(&mut rng), word(&mut rng), i.to_string()))
                .collect();
            let mut remarks = HashMap::new();
            for m in &all {
                if rng.random_bool(0.3) {
                    remarks.insert(m.user_name.clone(), word(&mut rng));
                }
            }
            let query = word(&mut rng);
            if query.trim().is_empty() {
                continue;
            }

            let kept = filter(&all, &remarks, &query);
            let expected: Vec<Message> = all
                .iter()
                .filter(|m| {
                    let q = query.trim().to_lowercase();
                    m.user_name.to_lowercase().contains(&q)
                        || m.content.to_lowercase().contains(&q)
                        || remarks
                            .get(&m.user_name)
                            .is_some_and(|r| r.to_lowercase().contains(&q))
                })
                .cloned()
                .collect();
            assert_eq!(kept, expected, "query {:?}", query);
        }
    }
}
