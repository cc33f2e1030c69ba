//! Walk a list of items, deleting duplicates outright and, when probing,
//! asking about each live or dead link in turn.

use std::{
    collections::HashSet,
    io::{self, Write},
};

use thiserror::Error;
use tracing::debug;

use crate::{
    api::{self, Action, Item, Modifier},
    browser::Browser,
    canonical::canonicalize,
    error::describe,
    probe::{Outcome, Prober},
    prompt::{self, Prompt},
    template::{self, Template},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    /// Delete everything after one confirmation; no probing, no dedup.
    pub delete_all: bool,
    /// Probe each unique item and ask whether to delete it.
    pub probe: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub total: usize,
    pub duplicates: usize,
    pub deleted: usize,
    pub failures: usize,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Template(#[from] template::Error),
    #[error(transparent)]
    Prompt(#[from] prompt::Error),
    #[error("Failed to write output")]
    Output(#[from] io::Error),
    #[error("Bulk delete failed")]
    BulkDelete(#[source] api::Error),
}

pub struct Cull<'a> {
    modifier: &'a dyn Modifier,
    prober: &'a dyn Prober,
    browser: &'a dyn Browser,
    prompt: &'a mut dyn Prompt,
    template: &'a Template,
    out: &'a mut dyn Write,
}

impl<'a> Cull<'a> {
    pub fn new(
        modifier: &'a dyn Modifier,
        prober: &'a dyn Prober,
        browser: &'a dyn Browser,
        prompt: &'a mut dyn Prompt,
        template: &'a Template,
        out: &'a mut dyn Write,
    ) -> Self {
        Self {
            modifier,
            prober,
            browser,
            prompt,
            template,
            out,
        }
    }

    /// Process `items` in ascending sort order.
    ///
    /// Failures on one item are reported and counted; only output, template
    /// and prompt failures (including the operator quitting) stop the run.
    pub fn run(&mut self, mut items: Vec<Item>, policy: Policy) -> Result<Report, Error> {
        items.sort_by_key(|item| item.sort_id);
        if policy.delete_all {
            return self.delete_all(&items);
        }

        let mut report = Report {
            total: items.len(),
            ..Default::default()
        };
        let mut seen = HashSet::new();
        for (i, item) in items.iter().enumerate() {
            let rendered = self.template.render(item)?;
            write!(self.out, "{}/{} {}", i + 1, report.total, rendered)?;

            if !seen.insert(canonicalize(item.url())) {
                writeln!(self.out, "\nItem already seen. Deleting...")?;
                report.duplicates += 1;
                self.delete(item, &mut report)?;
                writeln!(self.out)?;
                continue;
            }

            if policy.probe {
                self.probe(item, &mut report)?;
                if self.prompt.confirm("Delete?")? {
                    self.delete(item, &mut report)?;
                }
            }
            writeln!(self.out)?;
        }
        Ok(report)
    }

    /// Always asks, even for an empty list; an empty confirmed batch sends
    /// nothing.
    fn delete_all(&mut self, items: &[Item]) -> Result<Report, Error> {
        let mut report = Report {
            total: items.len(),
            ..Default::default()
        };
        if !self
            .prompt
            .confirm(&format!("Really delete {} items?", items.len()))?
            || items.is_empty()
        {
            return Ok(report);
        }

        let actions: Vec<Action> = items.iter().map(|i| Action::delete(i.item_id)).collect();
        let result = self
            .modifier
            .modify(&actions)
            .map_err(Error::BulkDelete)?;
        report.deleted = result.action_results.iter().filter(|ok| **ok).count();
        report.failures = actions.len().saturating_sub(report.deleted);
        Ok(report)
    }

    fn probe(&mut self, item: &Item, report: &mut Report) -> Result<(), Error> {
        match self.prober.probe(item.url()) {
            Ok(Outcome::Response(result)) if result.is_alive() => {
                writeln!(self.out, " {} {}", result.status, result.status_text)?;
                let question = if same_location(&result.final_url, item.url()) {
                    "Open?".to_owned()
                } else {
                    format!("Open {}?", result.final_url)
                };
                if self.prompt.confirm(&question)?
                    && let Err(e) = self.browser.open(&result.final_url)
                {
                    report.failures += 1;
                    writeln!(self.out, "Failed to open {}: {e}", result.final_url)?;
                }
            }
            Ok(Outcome::Response(result)) => {
                writeln!(
                    self.out,
                    "\nStatus was {} {}",
                    result.status, result.status_text
                )?;
            }
            Ok(Outcome::Inconclusive) => {
                writeln!(self.out, "\nThe server closed the connection without answering")?;
            }
            Err(e) => {
                report.failures += 1;
                writeln!(self.out, "\n{}", describe(&e))?;
            }
        }
        Ok(())
    }

    fn delete(&mut self, item: &Item, report: &mut Report) -> io::Result<()> {
        match self.modifier.modify(&[Action::delete(item.item_id)]) {
            Ok(result) if result.all_succeeded() => {
                debug!(item_id = item.item_id, "deleted");
                report.deleted += 1;
            }
            Ok(_) => {
                report.failures += 1;
                writeln!(self.out, "Pocket did not delete item {}", item.item_id)?;
            }
            Err(e) => {
                report.failures += 1;
                writeln!(
                    self.out,
                    "Failed to delete item {}: {}",
                    item.item_id,
                    describe(&e)
                )?;
            }
        }
        Ok(())
    }
}

fn same_location(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::HashMap};

    use super::*;
    use crate::{
        api::{ModifyResult, RateLimit},
        probe::{self, ProbeResult},
        prompt::Scripted,
    };

    #[derive(Default)]
    struct RecordingModifier {
        calls: RefCell<Vec<Vec<Action>>>,
        failing: Vec<u64>,
    }

    impl Modifier for RecordingModifier {
        fn modify(&self, actions: &[Action]) -> Result<ModifyResult, api::Error> {
            self.calls.borrow_mut().push(actions.to_vec());
            if actions.iter().any(|a| self.failing.contains(&a.item_id)) {
                return Err(api::Error::Remote {
                    status: 503,
                    x_error: "maintenance".to_owned(),
                    x_error_code: "199".to_owned(),
                    limits: RateLimit::default(),
                });
            }
            Ok(ModifyResult {
                action_results: vec![true; actions.len()],
                status: 1,
            })
        }
    }

    #[derive(Default)]
    struct FakeProber {
        answers: HashMap<String, Outcome>,
        probed: RefCell<Vec<String>>,
    }

    impl FakeProber {
        fn answering(answers: &[(&str, u16, &str)]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(url, status, final_url)| {
                        (
                            (*url).to_owned(),
                            Outcome::Response(ProbeResult {
                                status: *status,
                                status_text: "Status".to_owned(),
                                final_url: (*final_url).to_owned(),
                            }),
                        )
                    })
                    .collect(),
                probed: RefCell::default(),
            }
        }
    }

    impl Prober for FakeProber {
        fn probe(&self, url: &str) -> Result<Outcome, probe::Error> {
            self.probed.borrow_mut().push(url.to_owned());
            Ok(self
                .answers
                .get(url)
                .cloned()
                .unwrap_or(Outcome::Inconclusive))
        }
    }

    #[derive(Default)]
    struct RecordingBrowser {
        opened: RefCell<Vec<String>>,
    }

    impl Browser for RecordingBrowser {
        fn open(&self, url: &str) -> io::Result<()> {
            self.opened.borrow_mut().push(url.to_owned());
            Ok(())
        }
    }

    struct Harness {
        modifier: RecordingModifier,
        prober: FakeProber,
        browser: RecordingBrowser,
        prompt: Scripted,
        template: Template,
        out: Vec<u8>,
    }

    impl Harness {
        fn new(prober: FakeProber, answers: &[&str]) -> Self {
            Self {
                modifier: RecordingModifier::default(),
                prober,
                browser: RecordingBrowser::default(),
                prompt: Scripted::new(answers.iter().copied()),
                template: Template::new("{{ item_id }} {{ url }}".to_owned()).unwrap(),
                out: Vec::new(),
            }
        }

        fn run(&mut self, items: Vec<Item>, policy: Policy) -> Result<Report, Error> {
            Cull::new(
                &self.modifier,
                &self.prober,
                &self.browser,
                &mut self.prompt,
                &self.template,
                &mut self.out,
            )
            .run(items, policy)
        }

        fn calls(&self) -> Vec<Vec<Action>> {
            self.modifier.calls.borrow().clone()
        }

        fn output(&self) -> String {
            String::from_utf8(self.out.clone()).unwrap()
        }
    }

    #[test]
    fn sorted_dedup_deletes_later_copy_only() {
        let mut h = Harness::new(FakeProber::default(), &[]);
        let items = vec![
            Item::new(1, "https://a.com/x", "one", 0, 2),
            Item::new(2, "http://a.com/x", "two", 0, 1),
        ];
        let report = h.run(items, Policy::default()).unwrap();

        assert_eq!(h.calls(), vec![vec![Action::delete(1)]]);
        assert!(h.prompt.asked.is_empty());
        assert!(h.prober.probed.borrow().is_empty());
        let output = h.output();
        let first = output.find("1/2 2 http://a.com/x").unwrap();
        let second = output.find("2/2 1 https://a.com/x").unwrap();
        assert!(first < second);
        assert!(output.contains("Item already seen. Deleting..."));
        assert_eq!(
            report,
            Report {
                total: 2,
                duplicates: 1,
                deleted: 1,
                failures: 0
            }
        );
    }

    #[test]
    fn duplicates_are_never_probed_or_asked_about() {
        let prober = FakeProber::answering(&[("https://a.com/x", 200, "https://a.com/x")]);
        let mut h = Harness::new(prober, &["n", "n"]);
        let items = vec![
            Item::new(1, "https://a.com/x", "", 0, 1),
            Item::new(2, "https://a.com/x/", "", 0, 2),
        ];
        h.run(
            items,
            Policy {
                probe: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(*h.prober.probed.borrow(), vec!["https://a.com/x"]);
        assert_eq!(h.prompt.asked, ["Open?", "Delete?"]);
        assert_eq!(h.calls(), vec![vec![Action::delete(2)]]);
    }

    #[test]
    fn delete_all_asks_once_and_sends_one_batch() {
        let mut h = Harness::new(FakeProber::default(), &["y"]);
        let items = vec![
            Item::new(10, "https://a.com", "", 0, 3),
            Item::new(11, "https://a.com", "", 0, 1),
            Item::new(12, "https://b.com", "", 0, 2),
        ];
        let report = h
            .run(
                items,
                Policy {
                    delete_all: true,
                    probe: true,
                },
            )
            .unwrap();

        assert_eq!(h.prompt.asked, ["Really delete 3 items?"]);
        assert_eq!(
            h.calls(),
            vec![vec![
                Action::delete(11),
                Action::delete(12),
                Action::delete(10)
            ]]
        );
        assert!(h.prober.probed.borrow().is_empty());
        assert_eq!(report.deleted, 3);
    }

    #[test]
    fn declined_delete_all_touches_nothing() {
        let mut h = Harness::new(FakeProber::default(), &["n"]);
        let items = vec![Item::new(10, "https://a.com", "", 0, 1)];
        let report = h
            .run(
                items,
                Policy {
                    delete_all: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(h.calls().is_empty());
        assert_eq!(report.deleted, 0);
    }

    #[test]
    fn delete_all_of_nothing_still_asks() {
        let mut h = Harness::new(FakeProber::default(), &["y"]);
        let report = h
            .run(
                Vec::new(),
                Policy {
                    delete_all: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(h.prompt.asked, ["Really delete 0 items?"]);
        assert!(h.calls().is_empty());
        assert_eq!(report, Report::default());
    }

    #[test]
    fn failed_bulk_delete_aborts() {
        let mut h = Harness::new(FakeProber::default(), &["y"]);
        h.modifier.failing = vec![10];
        let items = vec![Item::new(10, "https://a.com", "", 0, 1)];
        let result = h.run(
            items,
            Policy {
                delete_all: true,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::BulkDelete(_))));
    }

    #[test]
    fn redirected_item_offers_final_url() {
        let prober = FakeProber::answering(&[("https://sho.rt/1", 200, "https://long.example/page")]);
        let mut h = Harness::new(prober, &["y", "n"]);
        let items = vec![Item::new(1, "https://sho.rt/1", "", 0, 1)];
        h.run(
            items,
            Policy {
                probe: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(h.prompt.asked, ["Open https://long.example/page?", "Delete?"]);
        assert_eq!(*h.browser.opened.borrow(), vec!["https://long.example/page"]);
        assert!(h.calls().is_empty());
    }

    #[test]
    fn dead_item_reports_status_and_still_asks() {
        let prober = FakeProber::answering(&[("https://gone.com", 404, "https://gone.com")]);
        let mut h = Harness::new(prober, &["y"]);
        let items = vec![Item::new(5, "https://gone.com", "", 0, 1)];
        h.run(
            items,
            Policy {
                probe: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(h.prompt.asked, ["Delete?"]);
        assert!(h.output().contains("Status was 404"));
        assert_eq!(h.calls(), vec![vec![Action::delete(5)]]);
    }

    #[test]
    fn one_failed_delete_does_not_stop_the_rest() {
        let prober = FakeProber::answering(&[
            ("https://a.com", 404, "https://a.com"),
            ("https://b.com", 404, "https://b.com"),
        ]);
        let mut h = Harness::new(prober, &["y", "y"]);
        h.modifier.failing = vec![1];
        let items = vec![
            Item::new(1, "https://a.com", "", 0, 1),
            Item::new(2, "https://b.com", "", 0, 2),
        ];
        let report = h
            .run(
                items,
                Policy {
                    probe: true,
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(h.calls().len(), 2);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.failures, 1);
        assert!(h.output().contains("Failed to delete item 1"));
        assert!(h.output().contains("maintenance"));
    }

    #[test]
    fn quitting_stops_the_run() {
        let prober = FakeProber::answering(&[("https://a.com", 404, "https://a.com")]);
        let mut h = Harness::new(prober, &[]);
        let items = vec![
            Item::new(1, "https://a.com", "", 0, 1),
            Item::new(2, "https://b.com", "", 0, 2),
        ];
        let result = h.run(
            items,
            Policy {
                probe: true,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::Prompt(prompt::Error::Quit))));
        assert_eq!(h.prober.probed.borrow().len(), 1);
    }

    #[test]
    fn render_failure_is_fatal() {
        let mut h = Harness::new(FakeProber::default(), &[]);
        h.template = Template::new("{{ nope }}".to_owned()).unwrap();
        let items = vec![Item::new(1, "https://a.com", "", 0, 1)];
        let result = h.run(items, Policy::default());
        assert!(matches!(result, Err(Error::Template(_))));
        assert!(h.calls().is_empty());
    }
}
