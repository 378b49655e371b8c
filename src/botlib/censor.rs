use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use regex::Regex;
use serenity::all::{RoleId, UserId};
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::db::censors::{Censor, CensorType};
use crate::Error;

static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bhttps?://([^\s/?#<>]+)").expect("url regex is valid")
});

/// A censor ready to be matched against message content
#[derive(Debug)]
pub struct CompiledCensor {
    pub censor: Censor,
    pub kind: CensorType,
    term: String,
    regex: Option<Regex>,
}

impl CompiledCensor {
    pub fn new(censor: Censor) -> Result<Self, Error> {
        let Some(kind) = CensorType::from_db(&censor.censor_type) else {
            return Err(format!("Unknown censor type: {}", censor.censor_type).into());
        };

        let regex = match kind {
            // Terms may start or end with punctuation, so `\b` can't mark the edges
            CensorType::Exact => Some(Regex::new(&format!(
                r"(?i)(?:^|\W){}(?:$|\W)",
                regex::escape(&censor.censor_term)
            ))?),
            CensorType::Regex => Some(Regex::new(&censor.censor_term)?),
            _ => None,
        };

        let term = match kind {
            CensorType::Fuzzy => words(&censor.censor_term).join(" "),
            _ => censor.censor_term.to_lowercase(),
        };

        Ok(Self {
            term,
            kind,
            regex,
            censor,
        })
    }

    pub fn is_excluded(&self, author: UserId, roles: &[RoleId]) -> bool {
        self.censor.excluded_users.0.contains(&author.get())
            || roles
                .iter()
                .any(|r| self.censor.excluded_roles.0.contains(&r.get()))
    }

    pub fn matches(&self, content: &str) -> bool {
        match self.kind {
            CensorType::Exact | CensorType::Regex => self
                .regex
                .as_ref()
                .is_some_and(|regex| regex.is_match(content)),
            CensorType::Substring => content.to_lowercase().contains(&self.term),
            CensorType::Links => URL_REGEX
                .captures_iter(content)
                .filter_map(|c| c.get(1))
                .any(|host| host.as_str().to_lowercase().contains(&self.term)),
            CensorType::Fuzzy => {
                let threshold = self.censor.censor_threshold as f64 / 100.0;
                let span = self.term.split(' ').count().max(1);
                let words = words(content);

                if words.len() <= span {
                    return similarity(&words.join(" "), &self.term) >= threshold;
                }

                words
                    .windows(span)
                    .any(|w| similarity(&w.join(" "), &self.term) >= threshold)
            }
        }
    }
}

/// Lowercased alphanumeric words of `s`
fn words(s: &str) -> Vec<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalized levenshtein similarity, 1.0 for equal strings
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.chars().collect::<Vec<_>>();
    let b = b.chars().collect::<Vec<_>>();

    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }

    let mut prev = (0..=b.len()).collect::<Vec<_>>();
    let mut cur = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    1.0 - prev[b.len()] as f64 / longest as f64
}

/// Enabled censors, refreshed from the database after every censor change
#[derive(Default)]
pub struct CensorCache {
    censors: DashMap<i64, Arc<CompiledCensor>>,
    refresh_lock: Mutex<()>,
}

impl CensorCache {
    /// Reloads the enabled censors, one refresh at a time so an older read never lands last
    pub async fn refresh(&self, pool: &SqlitePool) -> Result<(), Error> {
        let _guard = self.refresh_lock.lock().await;
        let censors = crate::db::censors::enabled(pool).await?;
        self.replace(censors);
        Ok(())
    }

    /// Upserts `censors` then drops every other id, lookups never see an empty cache
    pub fn replace(&self, censors: Vec<Censor>) {
        let mut keep = HashSet::with_capacity(censors.len());

        for censor in censors {
            let id = censor.id;
            match CompiledCensor::new(censor) {
                Ok(compiled) => {
                    self.censors.insert(id, Arc::new(compiled));
                    keep.insert(id);
                }
                Err(e) => {
                    log::warn!("Skipping censor {}: {}", id, e);
                }
            }
        }

        self.censors.retain(|id, _| keep.contains(id));

        log::info!("Censor cache holds {} censors", self.censors.len());
    }

    pub fn len(&self) -> usize {
        self.censors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.censors.is_empty()
    }

    /// The lowest id censor matching `content` that the author isn't excluded from
    pub fn find_match(
        &self,
        content: &str,
        author: UserId,
        roles: &[RoleId],
    ) -> Option<Arc<CompiledCensor>> {
        self.censors
            .iter()
            .filter(|c| !c.is_excluded(author, roles) && c.matches(content))
            .min_by_key(|c| c.censor.id)
            .map(|c| c.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    fn censor(id: i64, term: &str, censor_type: CensorType, threshold: i64) -> Censor {
        Censor {
            id,
            censor_term: term.to_string(),
            censor_type: censor_type.as_str().to_string(),
            censor_threshold: threshold,
            enabled: true,
            excluded_users: Json(vec![]),
            excluded_roles: Json(vec![]),
        }
    }

    fn compiled(term: &str, censor_type: CensorType) -> CompiledCensor {
        CompiledCensor::new(censor(1, term, censor_type, 65)).unwrap()
    }

    #[test]
    fn exact_matches_whole_words() {
        let c = compiled("bad", CensorType::Exact);
        assert!(c.matches("that is BAD"));
        assert!(c.matches("bad, really"));
        assert!(!c.matches("badge"));
    }

    #[test]
    fn exact_terms_with_punctuation_edges() {
        let c = compiled("c++", CensorType::Exact);
        assert!(c.matches("I love c++"));
        assert!(c.matches("c++ is fine"));
        assert!(!c.matches("c++x"));

        let c = compiled("@everyone", CensorType::Exact);
        assert!(c.matches("hi @everyone"));
        assert!(c.matches("@everyone"));
        assert!(!c.matches("hi@everyone"));
    }

    #[test]
    fn substring_matches_anywhere() {
        let c = compiled("bad", CensorType::Substring);
        assert!(c.matches("a Badge"));
        assert!(!c.matches("good"));
    }

    #[test]
    fn regex_and_invalid_regex() {
        let c = compiled(r"fr[e3]{2}\s*nitro", CensorType::Regex);
        assert!(c.matches("get fr33 nitro now"));
        assert!(!c.matches("nitro"));

        assert!(CompiledCensor::new(censor(2, "(", CensorType::Regex, 65)).is_err());
    }

    #[test]
    fn links_match_hosts_only() {
        let c = compiled("badsite.com", CensorType::Links);
        assert!(c.matches("see https://www.BadSite.com/page"));
        assert!(!c.matches("badsite.com without a scheme"));
        assert!(!c.matches("https://good.com/badsite.com"));
    }

    #[test]
    fn fuzzy_uses_threshold() {
        let c = CompiledCensor::new(censor(1, "piracy", CensorType::Fuzzy, 80)).unwrap();
        assert!(c.matches("talking about piracyy here"));
        assert!(!c.matches("privacy"));
    }

    #[test]
    fn fuzzy_matches_multi_word_terms() {
        let c = CompiledCensor::new(censor(1, "free nitro", CensorType::Fuzzy, 65)).unwrap();
        assert!(c.matches("free nitro"));
        assert!(c.matches("get free nitro here"));
        assert!(c.matches("get FREE  nitr0 here"));
        assert!(!c.matches("nitro is free"));
        assert!(!c.matches("hello there"));
    }

    #[test]
    fn similarity_bounds() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert!((similarity("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
    }

    #[test]
    fn cache_respects_exclusions_and_order() {
        let cache = CensorCache::default();

        let mut excluded = censor(1, "spam", CensorType::Substring, 65);
        excluded.excluded_users = Json(vec![10]);
        excluded.excluded_roles = Json(vec![20]);

        cache.replace(vec![
            excluded,
            censor(2, "spam", CensorType::Exact, 65),
            censor(3, "(", CensorType::Regex, 65),
        ]);

        assert_eq!(cache.len(), 2);

        let hit = cache.find_match("spam", UserId::new(1), &[]).unwrap();
        assert_eq!(hit.censor.id, 1);

        let hit = cache.find_match("spam", UserId::new(10), &[]).unwrap();
        assert_eq!(hit.censor.id, 2);

        let hit = cache
            .find_match("spam", UserId::new(1), &[RoleId::new(20)])
            .unwrap();
        assert_eq!(hit.censor.id, 2);

        assert!(cache.find_match("hello", UserId::new(1), &[]).is_none());

        cache.replace(vec![censor(2, "spam", CensorType::Exact, 65)]);
        assert_eq!(cache.len(), 1);
        let hit = cache.find_match("spam", UserId::new(1), &[]).unwrap();
        assert_eq!(hit.censor.id, 2);
    }

    #[test]
    fn lookups_during_replace_never_miss() {
        let cache = CensorCache::default();
        let censors = || {
            vec![
                censor(1, "spam", CensorType::Substring, 65),
                censor(2, "eggs", CensorType::Substring, 65),
            ]
        };
        cache.replace(censors());

        let done = std::sync::atomic::AtomicBool::new(false);
        let misses = std::thread::scope(|s| {
            s.spawn(|| {
                for _ in 0..5_000 {
                    cache.replace(censors());
                }
                done.store(true, std::sync::atomic::Ordering::SeqCst);
            });

            let mut misses = 0;
            while !done.load(std::sync::atomic::Ordering::SeqCst) {
                if cache.find_match("spam", UserId::new(1), &[]).is_none() {
                    misses += 1;
                }
            }
            misses
        });

        assert_eq!(misses, 0);
    }
}
