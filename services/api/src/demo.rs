use crate::infra::{in_memory_service, InMemoryClearanceService};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use exit_clearance::error::AppError;
use exit_clearance::workflows::clearance::{
    ClearanceError, ClearancePolicy, ClearanceSummary, CommentUpsert, DepartmentId,
    EmployeeClearanceView, EmployeeId, Identity, NewDepartment, NewEmployee, NewQuestion,
    PairFilter, SeparationType,
};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Home department recorded for the demo employee. Empty means none.
    #[arg(long, default_value = "IT")]
    pub(crate) home_department: String,
    /// Also answer every IT question so the clearance completes.
    #[arg(long)]
    pub(crate) check_it: bool,
    /// Last working date (YYYY-MM-DD). Defaults to two weeks from today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) last_working_date: Option<NaiveDate>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        home_department,
        check_it,
        last_working_date,
    } = args;
    let last_working_date =
        last_working_date.unwrap_or_else(|| Local::now().date_naive() + Duration::days(14));
    let home_department = Some(home_department.trim().to_string()).filter(|name| !name.is_empty());

    println!("Exit clearance demo");
    let service = in_memory_service(ClearancePolicy::default());
    let outcome = seed_and_walk(&service, home_department, last_working_date, check_it)?;

    render_breakdown(&outcome.view);
    render_summary(&outcome.summary);
    Ok(())
}

pub(crate) struct DemoOutcome {
    pub(crate) view: EmployeeClearanceView,
    pub(crate) summary: ClearanceSummary,
}

/// Two departments: Sales with two general questions and IT with one general
/// and one concerned question. Sales always signs off; IT only on request.
pub(crate) fn seed_and_walk(
    service: &InMemoryClearanceService,
    home_department: Option<String>,
    last_working_date: NaiveDate,
    check_it: bool,
) -> Result<DemoOutcome, ClearanceError> {
    let hr = Identity::Hr;
    let sales = service.create_department(&hr, demo_department("Sales"))?;
    let it = service.create_department(&hr, demo_department("IT"))?;

    for (department, text, concerned_only) in [
        (sales.id, "Demo kit and samples returned", false),
        (sales.id, "Client accounts handed over", false),
        (it.id, "Laptop and peripherals returned", false),
        (it.id, "Production access revoked", true),
    ] {
        service.create_question(
            &hr,
            NewQuestion {
                department_id: department,
                text: text.to_string(),
                concerned_only,
            },
        )?;
    }

    let employee = service.create_employee(
        &hr,
        NewEmployee {
            name: "Dana Reyes".to_string(),
            employee_code: "EMP-0042".to_string(),
            home_department,
            designation: "Site Reliability Engineer".to_string(),
            last_working_date,
            separation_type: SeparationType::Resignation,
            assigned_departments: vec![sales.id, it.id],
        },
    )?;
    println!(
        "- Registered {} ({}) leaving on {}",
        employee.name, employee.employee_code, employee.last_working_date
    );

    sign_off(service, employee.id, sales.id, "All sales material returned")?;
    if check_it {
        sign_off(service, employee.id, it.id, "Access removed, hardware received")?;
    }

    Ok(DemoOutcome {
        view: service.get_responses_for_employee(&hr, employee.id)?,
        summary: service.get_summary()?,
    })
}

fn demo_department(name: &str) -> NewDepartment {
    NewDepartment {
        name: name.to_string(),
        email: format!("{}@corp.example", name.to_lowercase()),
        is_assignable: true,
    }
}

fn sign_off(
    service: &InMemoryClearanceService,
    employee: EmployeeId,
    department: DepartmentId,
    note: &str,
) -> Result<(), ClearanceError> {
    let identity = Identity::Department(department);
    let checklist = service.questions_for_employee(&identity, employee, department)?;
    for item in &checklist.questions {
        service.update_response(&identity, item.response_id, true)?;
    }
    service.upsert_comment(
        &identity,
        CommentUpsert {
            employee: Some(employee),
            department: Some(department),
            comment_text: note.to_string(),
            department_head_id: None,
        },
    )?;

    let answered = service
        .list_responses(&identity, PairFilter::pair(employee, department))?
        .len();
    println!("- Department {department} checked {answered} item(s)");
    Ok(())
}

fn render_breakdown(view: &EmployeeClearanceView) {
    println!(
        "\nClearance for {} (home department: {})",
        view.employee,
        view.employee_department.as_deref().unwrap_or("none")
    );
    println!("Overall status: {}", view.overall_status);
    for department in &view.departments {
        println!("  {} [{}]", department.department, department.status);
        for question in &department.questions {
            let mark = if question.is_checked { "x" } else { " " };
            let scope = if question.is_concerned_question {
                " (home department only)"
            } else {
                ""
            };
            println!("    [{mark}] {}{scope}", question.text);
        }
        if !department.comment.is_empty() {
            println!("    Comment: {}", department.comment);
        }
    }
}

fn render_summary(summary: &ClearanceSummary) {
    println!(
        "\nSummary: {} employee(s) | {} pending | {} in progress | {} done",
        summary.total, summary.pending, summary.in_progress, summary.done
    );
}
