use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;

use scraper::Html;
use serde::Serialize;

use crate::assign::assign_mandate;
use crate::dates::normalize_lenient;
use crate::parser::{mandate_blocks, parse_term_listing, person_id_from_url, profile_image};
use crate::scraper::ScraperError;
use crate::store::StoreError;
use crate::terms::TermIndex;
use crate::types::{ListingEntry, MandateRecord, Person};

pub trait PageFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, ScraperError>>;
}

/// Last write wins on `(id, term, faction, start_date)`.
pub trait RecordSink {
    fn upsert(&mut self, record: &MandateRecord) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("Failed to store record: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub terms_crawled: usize,
    pub terms_skipped: usize,
    pub persons_visited: usize,
    pub persons_failed: usize,
    pub duplicates_skipped: usize,
    pub mandates_saved: usize,
    pub mandates_skipped: usize,
}

impl Display for CrawlStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  Terms crawled:        {}", self.terms_crawled)?;
        writeln!(f, "  Terms skipped:        {}", self.terms_skipped)?;
        writeln!(f, "  Persons visited:      {}", self.persons_visited)?;
        writeln!(f, "  Persons failed:       {}", self.persons_failed)?;
        writeln!(f, "  Duplicate rows:       {}", self.duplicates_skipped)?;
        writeln!(f, "  Mandates saved:       {}", self.mandates_saved)?;
        writeln!(f, "  Mandates skipped:     {}", self.mandates_skipped)
    }
}

#[derive(Debug, Default)]
struct CrawlRun {
    seen: HashSet<String>,
    stats: CrawlStats,
}

pub struct Crawler<F, S> {
    terms: TermIndex,
    fetcher: F,
    sink: S,
}

impl<F: PageFetcher, S: RecordSink> Crawler<F, S> {
    pub fn new(terms: TermIndex, fetcher: F, sink: S) -> Self {
        Self {
            terms,
            fetcher,
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub async fn run(&mut self, term_ids: &[String]) -> Result<CrawlStats, CrawlError> {
        let mut run = CrawlRun::default();

        for term_id in term_ids {
            let Some(listing_url) = self.terms.get(term_id).and_then(|t| t.listing_url()) else {
                log::warn!("Skipping unknown term {}", term_id);
                run.stats.terms_skipped += 1;
                continue;
            };

            log::info!("Crawling term {}: {}", term_id, listing_url);
            let entries = match self.fetch_listing(&listing_url).await {
                Ok(entries) => entries,
                Err(e) => {
                    log::error!("Skipping term {}: {}", term_id, e);
                    run.stats.terms_skipped += 1;
                    continue;
                }
            };
            run.stats.terms_crawled += 1;
            log::info!("Term {} lists {} members", term_id, entries.len());

            for entry in &entries {
                if run.seen.contains(&entry.url) {
                    log::debug!("Already visited {}", entry.url);
                    run.stats.duplicates_skipped += 1;
                    continue;
                }
                self.crawl_person(&mut run, entry).await?;
            }
        }

        Ok(run.stats)
    }

    async fn fetch_listing(&self, url: &str) -> Result<Vec<ListingEntry>, ScraperError> {
        let html = self.fetcher.fetch(url).await?;
        Ok(parse_term_listing(&html, url)?)
    }

    async fn crawl_person(
        &mut self,
        run: &mut CrawlRun,
        entry: &ListingEntry,
    ) -> Result<(), CrawlError> {
        let html = match self.fetcher.fetch(&entry.url).await {
            Ok(html) => html,
            Err(e) => {
                log::warn!("Skipping person {}: {}", entry.url, e);
                run.stats.persons_failed += 1;
                return Ok(());
            }
        };
        run.seen.insert(entry.url.clone());

        let id = match person_id_from_url(&entry.url) {
            Ok(id) => id,
            Err(e) => {
                log::warn!("Skipping person '{}': {}", entry.name, e);
                run.stats.persons_failed += 1;
                return Ok(());
            }
        };
        run.stats.persons_visited += 1;

        let document = Html::parse_document(&html);
        let person = Person {
            id,
            name: entry.name.clone(),
            birth_date: normalize_lenient(&entry.birth_text, "birth date"),
            death_date: normalize_lenient(&entry.death_text, "death date"),
            source_url: entry.url.clone(),
            image_url: profile_image(&document, &entry.url),
        };
        log::info!("Processing {} ({})", person.name, person.id);

        for block in mandate_blocks(&document) {
            match assign_mandate(&self.terms, &person, &block) {
                Ok(record) => {
                    if let Some(note) = &block.reelection_note {
                        log::info!("{} [{}]: {}", person.name, record.term, note);
                    }
                    self.sink.upsert(&record)?;
                    log::debug!("Saved {}", record);
                    run.stats.mandates_saved += 1;
                }
                Err(e) => {
                    log::warn!(
                        "Skipping mandate '{}' of {}: {}",
                        block.period_text,
                        person.source_url,
                        e
                    );
                    run.stats.mandates_skipped += 1;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use std::cell::RefCell;
    use std::collections::HashMap;

    const SITE: &str = "http://www.assemblee-nationale.fr/sycomore";

    #[derive(Default)]
    struct FakeSite {
        pages: HashMap<String, String>,
        requests: RefCell<Vec<String>>,
    }

    impl FakeSite {
        fn page(mut self, url: String, html: &str) -> Self {
            self.pages.insert(url, html.to_string());
            self
        }

        fn requests_for(&self, url: &str) -> usize {
            self.requests.borrow().iter().filter(|u| *u == url).count()
        }
    }

    impl PageFetcher for FakeSite {
        async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
            self.requests.borrow_mut().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ScraperError::NotFound(url.to_string()))
        }
    }

    impl RecordSink for Vec<MandateRecord> {
        fn upsert(&mut self, record: &MandateRecord) -> Result<(), StoreError> {
            self.push(record.clone());
            Ok(())
        }
    }

    struct BrokenSink;

    impl RecordSink for BrokenSink {
        fn upsert(&mut self, _record: &MandateRecord) -> Result<(), StoreError> {
            Err(StoreError::from(rusqlite::Error::InvalidQuery))
        }
    }

    fn listing_url(legislature: u32) -> String {
        format!("{SITE}/result.asp?choixordre=chrono&legislature={legislature}")
    }

    fn person_url(num: u32) -> String {
        format!("{SITE}/fiche.asp?num_dept={num}")
    }

    fn listing(rows: &[(u32, &str, &str)]) -> String {
        let rows: String = rows
            .iter()
            .map(|(num, name, birth)| {
                format!(
                    r#"<tr><td><a href="fiche.asp?num_dept={num}">{name}</a></td><td>{birth}</td><td></td></tr>"#
                )
            })
            .collect();
        format!(r#"<div id="corps_tableau"><table>{rows}</table></div>"#)
    }

    fn fiche(paragraphs: &[&str]) -> String {
        let body: String = paragraphs.iter().map(|p| format!("<p>{p}</p>")).collect();
        format!(
            r#"<img class="deputy-profile-picture" src="/tribun/photos/1.jpg"><div id="assemblee">{body}</div>"#
        )
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_current_term_mandate_is_persisted() {
        let site = FakeSite::default()
            .page(listing_url(59), &listing(&[(1234, "Marie Dupont", "02/01/1950")]))
            .page(
                person_url(1234),
                &fiche(&["<b>Depuis le 20 juin 2012 (mandat en cours)</b> : Paris - Groupe X"]),
            );
        let store = SqliteStore::open_in_memory().unwrap();

        let mut crawler = Crawler::new(TermIndex::fifth_republic(), site, store);
        let stats = crawler.run(&ids(&["14"])).await.unwrap();

        assert_eq!(stats.terms_crawled, 1);
        assert_eq!(stats.mandates_saved, 1);

        let records = crawler.sink().records().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, "1234");
        assert_eq!(record.name, "Marie Dupont");
        assert_eq!(record.birth_date, "1950-01-02");
        assert_eq!(record.term, "14");
        assert_eq!(record.start_date, "2012-06-20");
        assert_eq!(record.end_date, "");
        assert_eq!(record.area, "Paris");
        assert_eq!(record.faction, "Groupe X");
        assert_eq!(record.source, person_url(1234));
        assert_eq!(record.image, "http://www.assemblee-nationale.fr/tribun/photos/1.jpg");
    }

    #[tokio::test]
    async fn test_person_is_visited_once() {
        let site = FakeSite::default()
            .page(
                listing_url(59),
                &listing(&[(1, "Marie Dupont", ""), (1, "Marie Dupont", "")]),
            )
            .page(listing_url(58), &listing(&[(1, "Marie Dupont", "")]))
            .page(
                person_url(1),
                &fiche(&[
                    "<b>Depuis le 20 juin 2012</b> : Paris - Groupe X",
                    "<b>Du 20 juin 2007 au 19 juin 2012</b> : Paris - Groupe X - réélue le 20 juin 2012",
                ]),
            );

        let mut crawler = Crawler::new(TermIndex::fifth_republic(), site, Vec::new());
        let stats = crawler.run(&ids(&["14", "13"])).await.unwrap();

        assert_eq!(crawler.fetcher.requests_for(&person_url(1)), 1);
        assert_eq!(stats.persons_visited, 1);
        assert_eq!(stats.duplicates_skipped, 2);

        let records = crawler.into_sink();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].term, "14");
        assert_eq!(records[1].term, "13");
        assert_eq!(records[1].faction, "Groupe X");
    }

    #[tokio::test]
    async fn test_terms_are_crawled_in_given_order() {
        let site = FakeSite::default()
            .page(listing_url(46), &listing(&[]))
            .page(listing_url(59), &listing(&[]));

        let mut crawler = Crawler::new(TermIndex::fifth_republic(), site, Vec::new());
        crawler.run(&ids(&["14", "1"])).await.unwrap();

        let requests = crawler.fetcher.requests.borrow().clone();
        assert_eq!(requests, vec![listing_url(59), listing_url(46)]);
    }

    #[tokio::test]
    async fn test_failed_listing_skips_only_that_term() {
        let site = FakeSite::default()
            .page(listing_url(59), "<html><body>Service indisponible</body></html>")
            .page(listing_url(57), &listing(&[(7, "Jean Martin", "")]))
            .page(
                person_url(7),
                &fiche(&["<b>Du 19 juin 2002 au 19 juin 2007</b> : Nord - Groupe Z"]),
            );

        let mut crawler = Crawler::new(TermIndex::fifth_republic(), site, Vec::new());
        let stats = crawler.run(&ids(&["14", "13", "12", "99"])).await.unwrap();

        assert_eq!(stats.terms_crawled, 1);
        assert_eq!(stats.terms_skipped, 3);
        let records = crawler.into_sink();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].term, "12");
    }

    #[tokio::test]
    async fn test_failed_person_is_retried_from_later_listing() {
        let site = FakeSite::default()
            .page(listing_url(59), &listing(&[(5, "Absent", "")]))
            .page(listing_url(58), &listing(&[(5, "Absent", "")]));

        let mut crawler = Crawler::new(TermIndex::fifth_republic(), site, Vec::new());
        let stats = crawler.run(&ids(&["14", "13"])).await.unwrap();

        assert_eq!(stats.persons_failed, 2);
        assert_eq!(stats.persons_visited, 0);
        assert_eq!(crawler.fetcher.requests_for(&person_url(5)), 2);
    }

    #[tokio::test]
    async fn test_person_without_id_counts_once() {
        let site = FakeSite::default()
            .page(
                listing_url(59),
                r#"<div id="corps_tableau"><table>
                    <tr><td><a href="fiche.asp?autre=1">Sans Identifiant</a></td><td></td><td></td></tr>
                </table></div>"#,
            )
            .page(
                format!("{SITE}/fiche.asp?autre=1"),
                &fiche(&["<b>Depuis le 20 juin 2012</b> : Paris - Groupe X"]),
            );

        let mut crawler = Crawler::new(TermIndex::fifth_republic(), site, Vec::new());
        let stats = crawler.run(&ids(&["14"])).await.unwrap();

        assert_eq!(stats.persons_failed, 1);
        assert_eq!(stats.persons_visited, 0);
        assert_eq!(stats.mandates_saved, 0);
        assert!(crawler.into_sink().is_empty());
    }

    #[tokio::test]
    async fn test_bad_mandates_are_skipped() {
        let site = FakeSite::default()
            .page(listing_url(59), &listing(&[(3, "Paul Durand", "vers 1940")]))
            .page(
                person_url(3),
                &fiche(&[
                    "<b>Du 1er novembre 1962 au 10 novembre 1962</b> : Var - Groupe A",
                    "<b>Du 3 brumaire 1962 au 10 novembre 1965</b> : Var - Groupe B",
                    "<b>Législature 1962</b> : Var - Groupe C",
                    "<b>Du 1er avril 1993 au 20 avril 1997</b> : Var - Groupe D",
                ]),
            );

        let mut crawler = Crawler::new(TermIndex::fifth_republic(), site, Vec::new());
        let stats = crawler.run(&ids(&["14"])).await.unwrap();

        assert_eq!(stats.mandates_saved, 1);
        assert_eq!(stats.mandates_skipped, 2);
        let records = crawler.into_sink();
        assert_eq!(records[0].faction, "Groupe D");
        assert_eq!(records[0].term, "10");
        assert_eq!(records[0].birth_date, "");
    }

    #[tokio::test]
    async fn test_storage_failure_aborts() {
        let site = FakeSite::default()
            .page(listing_url(59), &listing(&[(1, "Marie Dupont", "")]))
            .page(person_url(1), &fiche(&["<b>Depuis le 20 juin 2012</b> : Paris - Groupe X"]));

        let mut crawler = Crawler::new(TermIndex::fifth_republic(), site, BrokenSink);
        let result = crawler.run(&ids(&["14"])).await;
        assert!(matches!(result, Err(CrawlError::Store(_))));
    }
}
