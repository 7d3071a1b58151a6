use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use tillpoint_core::{EngineError, EngineResult, LoanEntryId, LoanPaymentId, ShopId, TransactionId};
use tillpoint_store::{
    DocumentStore, DocumentStoreExt, ExpectedRevision, collections,
};

/// Lifecycle of one loan entry. `Paid` iff the remaining amount is zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Outstanding,
    Paid,
}

/// Store-extended credit created at sale time.
///
/// The customer is a free-text name, not a foreign key; matching is
/// case-insensitive string equality, so duplicate spellings of a customer are
/// one customer and distinct customers sharing a name are merged. A carried
/// simplification of the checkout flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanEntry {
    pub id: LoanEntryId,
    pub shop_id: ShopId,
    pub customer_name: String,
    /// Receipt transaction that originated this loan.
    pub transaction_id: TransactionId,
    pub original_amount: Decimal,
    pub remaining_amount: Decimal,
    pub paid_amount: Decimal,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_paid_at: Option<DateTime<Utc>>,
}

/// Immutable record of one payment applied against a customer's loans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanPayment {
    pub id: LoanPaymentId,
    pub shop_id: ShopId,
    pub customer_name: String,
    /// Transaction id of the payment itself.
    pub transaction_id: TransactionId,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Result of a payment allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationOutcome {
    /// The clamped amount actually applied (drives the payment receipt).
    pub applied_amount: Decimal,
    /// Absent when nothing was outstanding and nothing was applied.
    pub payment_record_id: Option<LoanPaymentId>,
}

/// Customer loan ledger and payment allocator.
#[derive(Debug)]
pub struct LoanLedger<S> {
    store: S,
}

impl<S: DocumentStore> LoanLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create an outstanding entry for the credit portion of a sale.
    pub fn record_loan(
        &self,
        shop_id: ShopId,
        customer_name: &str,
        transaction_id: TransactionId,
        amount: Decimal,
    ) -> EngineResult<LoanEntryId> {
        if customer_name.trim().is_empty() {
            return Err(EngineError::validation("customer name cannot be empty"));
        }
        if amount <= Decimal::ZERO {
            return Err(EngineError::validation("loan amount must be positive"));
        }

        let entry = LoanEntry {
            id: LoanEntryId::new(),
            shop_id,
            customer_name: customer_name.to_string(),
            transaction_id,
            original_amount: amount,
            remaining_amount: amount,
            paid_amount: Decimal::ZERO,
            status: LoanStatus::Outstanding,
            created_at: Utc::now(),
            last_paid_at: None,
        };

        self.store.insert(collections::CUSTOMER_LOANS, &entry)?;
        Ok(entry.id)
    }

    /// All loan entries for a shop (back-office listing). Unordered.
    pub fn list_by_shop(&self, shop_id: ShopId) -> EngineResult<Vec<LoanEntry>> {
        Ok(self
            .store
            .find(collections::CUSTOMER_LOANS, "shopId", &json!(shop_id))?)
    }

    /// Outstanding entries for one customer, oldest first.
    pub fn outstanding_for_customer(
        &self,
        shop_id: ShopId,
        customer_name: &str,
    ) -> EngineResult<Vec<LoanEntry>> {
        let mut entries: Vec<LoanEntry> = self
            .store
            .find(collections::CUSTOMER_LOANS, "shopId", &json!(shop_id))?;
        entries.retain(|e| {
            e.status != LoanStatus::Paid && name_matches(&e.customer_name, customer_name)
        });
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(entries)
    }

    /// Allocate a payment across a customer's outstanding entries,
    /// oldest debt first (FIFO).
    ///
    /// The payment is clamped to the customer's total outstanding amount;
    /// the clamped amount is what lands on the payment record and what is
    /// returned. Entries sharing a timestamp keep their stored order.
    pub fn allocate_payment(
        &self,
        shop_id: ShopId,
        customer_name: &str,
        payment_amount: Decimal,
    ) -> EngineResult<AllocationOutcome> {
        let mut entries: Vec<(LoanEntry, u64)> = self
            .store
            .find_revisioned(collections::CUSTOMER_LOANS, "shopId", &json!(shop_id))?;
        entries.retain(|(e, _)| {
            e.status != LoanStatus::Paid && name_matches(&e.customer_name, customer_name)
        });
        entries.sort_by(|(a, _), (b, _)| a.created_at.cmp(&b.created_at));

        let total_outstanding: Decimal =
            entries.iter().map(|(e, _)| e.remaining_amount).sum();
        let applied = payment_amount
            .max(Decimal::ZERO)
            .min(total_outstanding);

        let mut leftover = applied;
        for (mut entry, rev) in entries {
            if leftover <= Decimal::ZERO {
                break;
            }

            if entry.remaining_amount <= leftover {
                leftover -= entry.remaining_amount;
                entry.paid_amount += entry.remaining_amount;
                entry.remaining_amount = Decimal::ZERO;
                entry.status = LoanStatus::Paid;
            } else {
                entry.remaining_amount -= leftover;
                entry.paid_amount += leftover;
                leftover = Decimal::ZERO;
            }
            entry.last_paid_at = Some(Utc::now());

            // Exact-revision write: a concurrent mutation of the same entry
            // surfaces as a conflict instead of a lost update.
            self.store.update_by_id(
                collections::CUSTOMER_LOANS,
                *entry.id.as_uuid(),
                json!({
                    "remainingAmount": entry.remaining_amount,
                    "paidAmount": entry.paid_amount,
                    "status": entry.status,
                    "lastPaidAt": entry.last_paid_at,
                }),
                ExpectedRevision::Exact(rev),
            )?;
        }

        if applied <= Decimal::ZERO {
            tracing::debug!(
                shop_id = %shop_id,
                customer = %customer_name,
                "payment allocation applied nothing: no outstanding entries"
            );
            return Ok(AllocationOutcome {
                applied_amount: Decimal::ZERO,
                payment_record_id: None,
            });
        }

        let payment = LoanPayment {
            id: LoanPaymentId::new(),
            shop_id,
            customer_name: customer_name.to_string(),
            transaction_id: TransactionId::new(),
            amount: applied,
            created_at: Utc::now(),
        };
        self.store
            .insert(collections::CUSTOMER_LOAN_PAYMENTS, &payment)?;

        Ok(AllocationOutcome {
            applied_amount: applied,
            payment_record_id: Some(payment.id),
        })
    }

    /// Payment history for a shop, newest first.
    pub fn list_payments(&self, shop_id: ShopId) -> EngineResult<Vec<LoanPayment>> {
        let mut payments: Vec<LoanPayment> = self.store.find(
            collections::CUSTOMER_LOAN_PAYMENTS,
            "shopId",
            &json!(shop_id),
        )?;
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }
}

fn name_matches(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
