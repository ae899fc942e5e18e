//! MASTER project fields derived from their SUB projects
//!
//! A MASTER's factory ids are the union of its SUBs' ids, its dates span the
//! fully dated SUBs and its status rolls up from theirs. SUBs inherit customer,
//! priority and service type from their MASTER.

use crate::database::{crud, Database};
use crate::error::{FlatError, Result};
use crate::events::EventSink;
use crate::models::{
    FactoryIds, FactoryType, Patch, Project, ProjectPatch, ProjectStatus, ProjectType,
};
use chrono::NaiveDate;
use tracing::{debug, instrument};

/// SUB projects of `master_id`, oldest first
#[must_use]
pub fn sub_projects_of<'a>(db: &'a Database, master_id: &str) -> Vec<&'a Project> {
    let mut subs: Vec<&Project> = db
        .projects
        .values()
        .filter(|project| {
            project.project_type == ProjectType::Sub
                && project.parent_id.as_deref() == Some(master_id)
        })
        .collect();
    subs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    subs
}

/// Deduplicated union of one factory role across `subs`, in first-seen order
fn factory_union(subs: &[&Project], role: FactoryType) -> Option<FactoryIds> {
    let mut union: Vec<String> = Vec::new();
    for id in subs
        .iter()
        .filter_map(|sub| sub.factory_ids(role))
        .flat_map(FactoryIds::iter)
    {
        if !union.iter().any(|seen| seen == id) {
            union.push(id.to_string());
        }
    }
    if union.is_empty() {
        None
    } else {
        Some(FactoryIds::Multiple(union))
    }
}

fn rolled_up_status(subs: &[&Project]) -> Option<ProjectStatus> {
    if subs.iter().all(|sub| sub.status == ProjectStatus::Completed) {
        Some(ProjectStatus::Completed)
    } else if subs.iter().any(|sub| sub.status == ProjectStatus::InProgress) {
        Some(ProjectStatus::InProgress)
    } else {
        None
    }
}

/// Patch bringing `master` in line with `subs`
///
/// Returns `None` when there are no SUBs; the MASTER keeps its own values in
/// that case. The patch only carries fields whose value changes and may be
/// empty.
#[must_use]
pub fn compute_master_aggregate(master: &Project, subs: &[&Project]) -> Option<ProjectPatch> {
    if subs.is_empty() {
        return None;
    }
    let mut patch = ProjectPatch::default();

    for role in FactoryType::ALL {
        let union = factory_union(subs, role);
        if master.factory_ids(role) != union.as_ref() {
            let field = match role {
                FactoryType::Manufacturing => &mut patch.manufacturer_id,
                FactoryType::Container => &mut patch.container_id,
                FactoryType::Packaging => &mut patch.packaging_id,
            };
            *field = Some(union);
        }
    }

    // Only SUBs with both dates count, so the MASTER range never inverts
    let ranges = subs
        .iter()
        .filter_map(|sub| Some((sub.start_date?, sub.end_date?)));
    let (start, end) = ranges.fold((None, None), |(start, end), (from, to)| {
        (
            Some(start.map_or(from, |s: NaiveDate| s.min(from))),
            Some(end.map_or(to, |e: NaiveDate| e.max(to))),
        )
    });
    if start.is_some() && start != master.start_date {
        patch.start_date = Some(start);
    }
    if end.is_some() && end != master.end_date {
        patch.end_date = Some(end);
    }

    if let Some(status) = rolled_up_status(subs) {
        if status != master.status {
            patch.status = Some(status);
        }
    }
    Some(patch)
}

/// Recompute and store the aggregates of one MASTER
///
/// Returns the updated MASTER when something changed, `None` when it was
/// already consistent or has no SUBs.
///
/// # Errors
///
/// Returns [`FlatError::ProjectNotFound`] for an unknown id and
/// [`FlatError::Validation`] when the project is not a MASTER
#[instrument(skip(db, sink))]
pub fn update_master_project_aggregates(
    db: &mut Database,
    master_id: &str,
    sink: &dyn EventSink,
) -> Result<Option<Project>> {
    let master = db
        .projects
        .get(master_id)
        .ok_or_else(|| FlatError::ProjectNotFound {
            id: master_id.to_string(),
        })?;
    if !master.is_master() {
        return Err(FlatError::validation(format!(
            "Project {master_id} is {:?}, not a MASTER project",
            master.project_type
        )));
    }

    let subs = sub_projects_of(db, master_id);
    let Some(patch) = compute_master_aggregate(master, &subs) else {
        return Ok(None);
    };
    if patch.is_empty() {
        return Ok(None);
    }
    debug!(master = master_id, subs = subs.len(), "Writing MASTER aggregates");
    crud::update::<Project>(db, master_id, patch, sink).map(Some)
}

/// Recompute every MASTER; returns how many changed
///
/// # Errors
///
/// Returns the first error raised while writing a MASTER
pub fn update_all_master_projects(db: &mut Database, sink: &dyn EventSink) -> Result<usize> {
    let master_ids: Vec<String> = db
        .projects
        .values()
        .filter(|project| project.is_master())
        .map(|project| project.id.clone())
        .collect();
    let mut changed = 0;
    for master_id in master_ids {
        if update_master_project_aggregates(db, &master_id, sink)?.is_some() {
            changed += 1;
        }
    }
    Ok(changed)
}

fn clamp_date(date: NaiveDate, lower: Option<NaiveDate>, upper: Option<NaiveDate>) -> NaiveDate {
    let date = lower.map_or(date, |lower| date.max(lower));
    upper.map_or(date, |upper| date.min(upper))
}

/// Pull `sub`'s dates inside `master`'s bounds; the MASTER never moves
pub fn clamp_dates_to_master(sub: &mut Project, master: &Project) {
    sub.start_date = sub
        .start_date
        .map(|date| clamp_date(date, master.start_date, master.end_date));
    sub.end_date = sub
        .end_date
        .map(|date| clamp_date(date, master.start_date, master.end_date));
}

/// Copy the MASTER-owned fields onto a new SUB and clamp its dates
pub fn inherit_from_master(sub: &mut Project, master: &Project) {
    sub.customer_id.clone_from(&master.customer_id);
    sub.customer.clone_from(&master.customer);
    sub.priority = master.priority;
    sub.service_type = master.service_type;
    clamp_dates_to_master(sub, master);
}

/// Whether a MASTER edit touched a field its SUBs mirror
#[must_use]
pub fn shared_fields_changed(before: &Project, after: &Project) -> bool {
    before.customer_id != after.customer_id
        || before.customer != after.customer
        || before.priority != after.priority
        || before.service_type != after.service_type
}

/// Patch writing the MASTER-owned fields onto a SUB
#[must_use]
pub fn shared_fields_patch(master: &Project) -> ProjectPatch {
    ProjectPatch {
        customer_id: Some(master.customer_id.clone()),
        customer: Some(master.customer.clone()),
        priority: Some(master.priority),
        service_type: Some(master.service_type),
        ..ProjectPatch::default()
    }
}

/// Whether a SUB edit changes what its MASTER aggregates
#[must_use]
pub fn affects_master_aggregate(before: &Project, after: &Project) -> bool {
    before.parent_id != after.parent_id
        || before.project_type != after.project_type
        || before.start_date != after.start_date
        || before.end_date != after.end_date
        || before.status != after.status
        || FactoryType::ALL
            .into_iter()
            .any(|role| before.factory_ids(role) != after.factory_ids(role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, ServiceType};
    use proptest::prelude::*;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    #[test]
    fn test_union_dates_and_list_shape() {
        let master = Project::new_master("m", "Master");
        let s1 = Project::new_sub("s1", "m", "One")
            .with_dates(date(1, 1), date(1, 10))
            .with_factory(FactoryType::Manufacturing, "f1");
        let s2 = Project::new_sub("s2", "m", "Two")
            .with_dates(date(1, 5), date(1, 20))
            .with_factory(FactoryType::Manufacturing, "f2");

        let patch = compute_master_aggregate(&master, &[&s1, &s2]).unwrap();
        assert_eq!(patch.start_date, Some(Some(date(1, 1))));
        assert_eq!(patch.end_date, Some(Some(date(1, 20))));
        assert_eq!(
            patch.manufacturer_id,
            Some(Some(FactoryIds::Multiple(vec!["f1".into(), "f2".into()])))
        );
        assert!(patch.container_id.is_none());
    }

    #[test]
    fn test_single_factory_union_stays_a_list() {
        let master = Project::new_master("m", "Master");
        let s1 = Project::new_sub("s1", "m", "One").with_factory(FactoryType::Packaging, "f6");
        let s2 = Project::new_sub("s2", "m", "Two").with_factory(FactoryType::Packaging, "f6");
        let patch = compute_master_aggregate(&master, &[&s1, &s2]).unwrap();
        assert_eq!(
            patch.packaging_id,
            Some(Some(FactoryIds::Multiple(vec!["f6".into()])))
        );
    }

    #[test]
    fn test_no_subs_leaves_master_alone() {
        let master = Project::new_master("m", "Master").with_dates(date(2, 1), date(2, 2));
        assert!(compute_master_aggregate(&master, &[]).is_none());
    }

    #[test]
    fn test_undated_subs_keep_master_dates() {
        let master = Project::new_master("m", "Master").with_dates(date(2, 1), date(2, 2));
        let sub = Project::new_sub("s1", "m", "One");
        let patch = compute_master_aggregate(&master, &[&sub]).unwrap();
        assert!(patch.start_date.is_none());
        assert!(patch.end_date.is_none());
    }

    #[test]
    fn test_half_dated_subs_do_not_move_master_dates() {
        let master = Project::new_master("m", "Master");
        let mut starts_only = Project::new_sub("s1", "m", "One");
        starts_only.start_date = Some(date(3, 10));
        let mut ends_only = Project::new_sub("s2", "m", "Two");
        ends_only.end_date = Some(date(2, 1));

        let patch = compute_master_aggregate(&master, &[&starts_only, &ends_only]).unwrap();
        assert!(patch.start_date.is_none());
        assert!(patch.end_date.is_none());

        let dated = Project::new_sub("s3", "m", "Three").with_dates(date(4, 1), date(4, 30));
        let patch =
            compute_master_aggregate(&master, &[&starts_only, &ends_only, &dated]).unwrap();
        assert_eq!(patch.start_date, Some(Some(date(4, 1))));
        assert_eq!(patch.end_date, Some(Some(date(4, 30))));
    }

    #[test]
    fn test_status_roll_up() {
        let master = Project::new_master("m", "Master");
        let done = Project::new_sub("s1", "m", "One").with_status(ProjectStatus::Completed);
        let busy = Project::new_sub("s2", "m", "Two").with_status(ProjectStatus::InProgress);
        let held = Project::new_sub("s3", "m", "Three").with_status(ProjectStatus::OnHold);

        let all_done = compute_master_aggregate(&master, &[&done, &done.clone()]).unwrap();
        assert_eq!(all_done.status, Some(ProjectStatus::Completed));

        let mixed = compute_master_aggregate(&master, &[&done, &busy]).unwrap();
        assert_eq!(mixed.status, Some(ProjectStatus::InProgress));

        let other = compute_master_aggregate(&master, &[&done, &held]).unwrap();
        assert_eq!(other.status, None);
    }

    #[test]
    fn test_inherit_and_clamp() {
        let master = Project::new_master("m", "Master")
            .with_customer("customer-1", "Amore")
            .with_priority(Priority::High)
            .with_service_type(ServiceType::Odm)
            .with_dates(date(3, 1), date(3, 31));
        let mut sub = Project::new_sub("s", "m", "Sub").with_dates(date(2, 20), date(4, 10));

        inherit_from_master(&mut sub, &master);
        assert_eq!(sub.customer_id.as_deref(), Some("customer-1"));
        assert_eq!(sub.priority, Priority::High);
        assert_eq!(sub.service_type, ServiceType::Odm);
        assert_eq!(sub.start_date, Some(date(3, 1)));
        assert_eq!(sub.end_date, Some(date(3, 31)));
        assert_eq!(master.start_date, Some(date(3, 1)));
    }

    #[test]
    fn test_change_detection() {
        let before = Project::new_sub("s", "m", "Sub");
        let renamed = Project {
            name: "Other".into(),
            ..before.clone()
        };
        assert!(!affects_master_aggregate(&before, &renamed));
        let moved = before.clone().with_factory(FactoryType::Container, "f3");
        assert!(affects_master_aggregate(&before, &moved));

        let reprioritized = before.clone().with_priority(Priority::Low);
        assert!(shared_fields_changed(&before, &reprioritized));
        assert!(!shared_fields_changed(&before, &moved));
    }

    proptest! {
        #[test]
        fn prop_clamped_dates_stay_in_master_bounds(
            master_start in 0i64..200,
            master_len in 0i64..200,
            sub_start in 0i64..500,
            sub_len in 0i64..300,
        ) {
            let base = date(1, 1);
            let ms = base + chrono::Duration::days(master_start);
            let me = ms + chrono::Duration::days(master_len);
            let ss = base + chrono::Duration::days(sub_start);
            let se = ss + chrono::Duration::days(sub_len);

            let master = Project::new_master("m", "Master").with_dates(ms, me);
            let mut sub = Project::new_sub("s", "m", "Sub").with_dates(ss, se);
            clamp_dates_to_master(&mut sub, &master);

            let (start, end) = (sub.start_date.unwrap(), sub.end_date.unwrap());
            prop_assert!(ms <= start && start <= me);
            prop_assert!(ms <= end && end <= me);
            prop_assert!(start <= end);
            prop_assert_eq!(master.start_date, Some(ms));
        }

        #[test]
        fn prop_aggregated_range_never_inverts(
            bounds in proptest::collection::vec(
                (proptest::option::of(0i64..365), proptest::option::of(0i64..120)),
                1..6,
            ),
        ) {
            let base = date(1, 1);
            let master = Project::new_master("m", "Master");
            let subs: Vec<Project> = bounds
                .iter()
                .enumerate()
                .map(|(index, (start, len))| {
                    let mut sub = Project::new_sub(format!("s{index}"), "m", "Sub");
                    sub.start_date = start.map(|days| base + chrono::Duration::days(days));
                    // a lone end date may fall before other SUBs' starts
                    sub.end_date = len.map(|days| {
                        start.map_or(base, |s| base + chrono::Duration::days(s))
                            + chrono::Duration::days(days)
                    });
                    sub
                })
                .collect();
            let refs: Vec<&Project> = subs.iter().collect();

            let mut aggregated = master.clone();
            compute_master_aggregate(&master, &refs).unwrap().apply(&mut aggregated);
            if let (Some(start), Some(end)) = (aggregated.start_date, aggregated.end_date) {
                prop_assert!(start <= end);
            }
        }
    }
}
