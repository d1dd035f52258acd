//! Test sets for retrieval evaluation.
//!
//! Supports:
//! - A built-in sample set over the StayEasy support corpus
//! - Custom JSON files in the same shape

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A question with the answer and source file it should be grounded in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub question: String,
    pub expected_answer: String,
    /// Filename of the document that holds the answer.
    pub expected_source: String,
}

impl TestCase {
    pub fn new(question: &str, expected_answer: &str, expected_source: &str) -> Self {
        Self {
            question: question.to_string(),
            expected_answer: expected_answer.to_string(),
            expected_source: expected_source.to_string(),
        }
    }
}

/// A named, ordered list of test cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSet {
    pub name: String,
    pub cases: Vec<TestCase>,
}

impl TestSet {
    /// Create a new empty test set.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cases: Vec::new(),
        }
    }

    pub fn add_case(&mut self, case: TestCase) {
        self.cases.push(case);
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// The first `n` cases (for quick runs).
    pub fn take(&self, n: usize) -> Self {
        Self {
            name: self.name.clone(),
            cases: self.cases.iter().take(n).cloned().collect(),
        }
    }

    /// Load from a JSON file.
    ///
    /// Expected format:
    /// ```json
    /// {
    ///   "name": "support",
    ///   "cases": [
    ///     {
    ///       "question": "What is the host service fee?",
    ///       "expected_answer": "3% of the booking subtotal.",
    ///       "expected_source": "for_hosts.md"
    ///     }
    ///   ]
    /// }
    /// ```
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read test set file: {:?}", path))?;
        let set: TestSet =
            serde_json::from_str(&content).with_context(|| "Failed to parse test set JSON")?;
        Ok(set)
    }

    /// Save to a JSON file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }
}

/// The ten StayEasy support questions.
pub fn sample_test_set() -> TestSet {
    let mut set = TestSet::new("stayeasy_sample");

    set.add_case(TestCase::new(
        "When was StayEasy founded and by whom?",
        "StayEasy was founded in 2021 by Maria Rodriguez and James Chen in San Francisco.",
        "company.md",
    ));
    set.add_case(TestCase::new(
        "What is the guest service fee?",
        "The guest service fee is 10-14% of the booking subtotal.",
        "pricing_fees.md",
    ));
    set.add_case(TestCase::new(
        "What is the host service fee percentage?",
        "The host service fee is 3% of the booking subtotal.",
        "for_hosts.md",
    ));
    set.add_case(TestCase::new(
        "What are the Superhost requirements?",
        "Superhosts need 10+ completed bookings, 90%+ response rate, less than 1% cancellation rate, and 4.8+ star rating.",
        "superhost.md",
    ));
    set.add_case(TestCase::new(
        "What is the cancellation policy for flexible bookings?",
        "Flexible policy gives full refund if cancelled 24+ hours before check-in, 50% refund if less than 24 hours.",
        "cancellation.md",
    ));
    set.add_case(TestCase::new(
        "How much property damage protection do hosts get?",
        "Hosts get $1,000,000 in property damage protection.",
        "for_hosts.md",
    ));
    set.add_case(TestCase::new(
        "When do hosts receive their payout?",
        "Host payouts are released 24 hours after guest check-in, with 3-5 business days processing.",
        "payments.md",
    ));
    set.add_case(TestCase::new(
        "What payment methods are accepted?",
        "Credit cards (Visa, Mastercard, Amex, Discover), debit cards, PayPal, Apple Pay, Google Pay, and gift cards.",
        "payments.md",
    ));
    set.add_case(TestCase::new(
        "What is the emergency phone number?",
        "The urgent safety line is 1-800-782-9111.",
        "trust_safety.md",
    ));
    set.add_case(TestCase::new(
        "How many photos are required for a listing?",
        "A minimum of 10 high-quality photos are required.",
        "for_hosts.md",
    ));

    set
}
