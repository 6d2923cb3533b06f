//! Question-selection rule shared by provisioning, question creation and the
//! read models.
//!
//! A department asks every one of its general questions. Its concerned-only
//! questions are added when the employee's home department name equals the
//! department name exactly (case-sensitive, no trimming).

use std::collections::BTreeSet;

use super::domain::{Department, Employee, Question, QuestionId};

/// Whether `department` is the employee's home department.
pub fn is_home_department(employee: &Employee, department: &Department) -> bool {
    employee.home_department.as_deref() == Some(department.name.as_str())
}

/// Whether `question` belongs on the checklist of the (employee, department) pair.
pub fn is_applicable(employee: &Employee, department: &Department, question: &Question) -> bool {
    question.department_id == department.id
        && (!question.concerned_only || is_home_department(employee, department))
}

/// Applicable questions in display order: general questions first, then by id.
///
/// The result does not depend on the order of `catalog`; questions owned by
/// other departments are ignored.
pub fn applicable_questions(
    employee: &Employee,
    department: &Department,
    catalog: &[Question],
) -> Vec<Question> {
    let mut selected: Vec<Question> = catalog
        .iter()
        .filter(|question| is_applicable(employee, department, question))
        .cloned()
        .collect();
    selected.sort_by_key(display_key);
    selected.dedup_by_key(|question| question.id);
    selected
}

pub fn applicable_question_ids(
    employee: &Employee,
    department: &Department,
    catalog: &[Question],
) -> BTreeSet<QuestionId> {
    catalog
        .iter()
        .filter(|question| is_applicable(employee, department, question))
        .map(|question| question.id)
        .collect()
}

pub(crate) fn display_key(question: &Question) -> (bool, QuestionId) {
    (question.concerned_only, question.id)
}
