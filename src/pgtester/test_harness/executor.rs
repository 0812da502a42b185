//! Test orchestration
//!
//! Groups run one after another in discovery order, and so do the tests inside
//! a group. Each group gets its own [`ConnectionManager`], created when the
//! group starts and closed when it ends.

use super::assertions::{compare_row_set, ComparisonOutcome};
use super::error::TestHarnessError;
use super::logging::LogHandle;
use super::report::{
    log_final_summary, log_group_banner, GroupSummary, OutcomeAggregator, RunSummary, TestRecord,
};
use super::spec::{TestDefinition, TestGroup};
use crate::pgtester::pg::{ConnectionManager, Connector};
use std::sync::Arc;

/// Runs test groups against a database transport
pub struct TestOrchestrator {
    connector: Arc<dyn Connector>,
    log: LogHandle,
}

impl TestOrchestrator {
    pub fn new(connector: Arc<dyn Connector>, log: LogHandle) -> Self {
        Self { connector, log }
    }

    /// Run every group and log the closing summary
    pub async fn run_all(&self, groups: &[TestGroup]) -> RunSummary {
        let mut aggregator = OutcomeAggregator::new();
        let mut summaries = Vec::with_capacity(groups.len());
        for group in groups {
            summaries.push(self.run_group(group, &mut aggregator).await);
        }
        log_final_summary(aggregator.unexpected());
        RunSummary::new(summaries, &aggregator)
    }

    /// Run the tests of one group, scoring each into `aggregator`
    ///
    /// Once connection retries are exhausted the remaining tests are scored
    /// as errors without contacting the database again.
    pub async fn run_group(
        &self,
        group: &TestGroup,
        aggregator: &mut OutcomeAggregator,
    ) -> GroupSummary {
        let name = group.name();
        self.log.set_debug(group.debug);
        log_group_banner(&name);

        let mut manager = ConnectionManager::new(
            group.connection.clone(),
            group.retry,
            Arc::clone(&self.connector),
            self.log.clone(),
        );
        let mut summary = GroupSummary::new(&name);

        for (index, definition) in group.tests.iter().enumerate() {
            let mut test = definition.clone();
            let outcome = match summary.abandoned.clone() {
                Some(cause) => ComparisonOutcome::ExecutionError(cause),
                None => self.run_test(&mut test, &mut manager, &mut summary).await,
            };
            let increase = aggregator.record(&test, &outcome);
            summary.tests.push(report_test(index, &test, outcome, increase > 0));
        }

        manager.disconnect().await;
        summary
    }

    async fn run_test(
        &self,
        test: &mut TestDefinition,
        manager: &mut ConnectionManager,
        summary: &mut GroupSummary,
    ) -> ComparisonOutcome {
        if let Err(e) = test.validate() {
            return ComparisonOutcome::ExecutionError(e.to_string());
        }

        match manager.run_query(&test.query, &[]).await {
            Ok(rows) => compare_row_set(&rows, &test.results),
            Err(e) => {
                let err = TestHarnessError::from(e).in_group(&summary.name);
                if err.is_connection_error() {
                    log::error!("{}, skipping remaining tests", err);
                    summary.abandoned = Some(err.to_string());
                }
                ComparisonOutcome::ExecutionError(err.to_string())
            }
        }
    }
}

fn report_test(
    index: usize,
    test: &TestDefinition,
    outcome: ComparisonOutcome,
    unexpected: bool,
) -> TestRecord {
    let message = match &outcome {
        ComparisonOutcome::Match => test.msg_on_success(),
        _ => test.msg_on_error(),
    };

    let line = match outcome.reason() {
        Some(reason) => format!("Test {} ({}): {} occurred: {}", index, test.name, message, reason),
        None => format!("Test {} ({}): {}", index, test.name, message),
    };
    if unexpected {
        log::error!("{}", line);
    } else {
        log::info!("{}", line);
    }

    TestRecord {
        index,
        name: test.name.clone(),
        reverse: test.reverse,
        outcome,
        message: message.to_string(),
        unexpected,
    }
}
