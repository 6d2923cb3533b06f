use tracing::debug;

use super::domain::{Department, Employee, QuestionId};
use super::repository::{ClearanceRepository, ProvisionOutcome, RepositoryError};
use super::selection::applicable_question_ids;

/// Bring the response and comment rows of an (employee, department) pair in
/// line with the selection rule.
///
/// Missing responses are created unchecked and a missing comment is created
/// empty. Nothing is deleted or overwritten, so repeated calls with unchanged
/// inputs create no rows. The store applies the whole pass atomically.
pub fn reconcile<R>(
    repository: &R,
    employee: &Employee,
    department: &Department,
) -> Result<ProvisionOutcome, RepositoryError>
where
    R: ClearanceRepository + ?Sized,
{
    let catalog = repository.questions(Some(department.id))?;
    let applicable: Vec<QuestionId> = applicable_question_ids(employee, department, &catalog)
        .into_iter()
        .collect();

    let outcome = repository.provision(employee.id, department.id, &applicable)?;
    if !outcome.is_noop() {
        debug!(
            employee = %employee.id,
            department = %department.id,
            responses_created = outcome.responses_created,
            comment_created = outcome.comment_created,
            "provisioned clearance checklist"
        );
    }
    Ok(outcome)
}
