//! Deterministic seed dataset
//!
//! Ids and timestamps are fixed, so two seeded databases compare equal. The
//! task sets pass every task validator and the MASTER aggregates are already
//! computed.

use crate::aggregation::{compute_master_aggregate, sub_projects_of};
use crate::database::{Database, Entity};
use crate::models::{
    Comment, CommentAuthor, CustomFieldDefinition, CustomFieldType, CustomFieldValue, Customer,
    EntityKind, Factory, FactoryAssignment, FactoryProject, FactoryType, FieldValue, MemberRole,
    Patch, Priority, PriorityMapping, Product, ProductCategory, Project, ProjectAssignment,
    ProjectStatus, ProjectTypeMapping, ReactionUser, Schedule, ServiceType, ServiceTypeMapping,
    StatusMapping, Task, TaskStatus, UiSetting, User, UserCustomer, UserFactory, UserRole,
    ValidationRules,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::json;

/// Ids of seeded records that tests and tools refer to
pub mod ids {
    pub const ADMIN: &str = "user-admin";
    pub const MANAGER: &str = "user-manager";
    pub const CUSTOMER_USER: &str = "user-customer";
    pub const MANUFACTURING_MANAGER: &str = "user-im-mfg";
    pub const PACKAGING_MANAGER: &str = "user-im-pkg";

    pub const CUSTOMER_AURORA: &str = "customer-aurora";
    pub const CUSTOMER_HARBOR: &str = "customer-harbor";

    pub const MFG_1: &str = "factory-mfg-1";
    pub const MFG_2: &str = "factory-mfg-2";
    pub const MFG_3: &str = "factory-mfg-3";
    pub const CTN_1: &str = "factory-ctn-1";
    pub const CTN_2: &str = "factory-ctn-2";
    pub const PKG_1: &str = "factory-pkg-1";
    pub const PKG_2: &str = "factory-pkg-2";

    pub const MASTER_SERUM: &str = "project-master-serum";
    pub const SUB_SERUM_30: &str = "project-sub-serum-30";
    pub const SUB_SERUM_50: &str = "project-sub-serum-50";
    pub const MASTER_SUN: &str = "project-master-sun";
    pub const SUB_SUN_STICK: &str = "project-sub-sun-stick";
    pub const SUB_SUN_LOTION: &str = "project-sub-sun-lotion";

    pub const SHELF_LIFE_FIELD: &str = "cf-shelf-life";
}

fn seeded_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap_or_default()
}

fn insert<T: Entity>(db: &mut Database, record: T) {
    T::table_mut(db).insert(record.id().to_string(), record);
}

/// Fix `created_at` and `updated_at` of records that carry both
macro_rules! stamped {
    ($record:expr) => {{
        let mut record = $record;
        record.created_at = seeded_at();
        record.updated_at = seeded_at();
        record
    }};
}

/// Build the seed database
#[must_use]
pub fn seed_database() -> Database {
    let mut db = Database::new();
    seed_people(&mut db);
    seed_factories(&mut db);
    seed_projects(&mut db);
    seed_schedules(&mut db);
    seed_comments(&mut db);
    seed_catalog(&mut db);
    seed_relations(&mut db);
    seed_mappings(&mut db);
    seed_custom_fields(&mut db);
    aggregate_masters(&mut db);
    db
}

fn seed_people(db: &mut Database) {
    let users = [
        User::new(ids::ADMIN, "Mina Park", "mina.park@flat.dev", UserRole::Admin),
        User::new(ids::MANAGER, "Jun Seo", "jun.seo@flat.dev", UserRole::Manager),
        User::new(
            ids::CUSTOMER_USER,
            "Clara Voss",
            "clara@aurora-cosmetics.com",
            UserRole::Customer,
        ),
        User::new(
            ids::MANUFACTURING_MANAGER,
            "Ravi Patel",
            "ravi.patel@flat.dev",
            UserRole::InternalManager,
        ),
        User::new(
            ids::PACKAGING_MANAGER,
            "Sofia Lind",
            "sofia.lind@flat.dev",
            UserRole::InternalManager,
        ),
    ];
    for mut user in users {
        user.internal_manager_type = match user.id.as_str() {
            ids::MANUFACTURING_MANAGER => Some(FactoryType::Manufacturing),
            ids::PACKAGING_MANAGER => Some(FactoryType::Packaging),
            _ => None,
        };
        insert(db, stamped!(user));
    }

    let mut aurora = Customer::new(ids::CUSTOMER_AURORA, "Aurora Cosmetics", "Clara Voss");
    aurora.email = Some("orders@aurora-cosmetics.com".to_string());
    let mut harbor = Customer::new(ids::CUSTOMER_HARBOR, "Blue Harbor Beauty", "Tomas Berg");
    harbor.email = Some("supply@blueharbor.example".to_string());
    insert(db, stamped!(aurora));
    insert(db, stamped!(harbor));
}

fn seed_factories(db: &mut Database) {
    let factories = [
        (ids::MFG_1, "Hanul Formulation Lab", FactoryType::Manufacturing, 40_000),
        (ids::MFG_2, "Seoul Bio Manufacturing", FactoryType::Manufacturing, 25_000),
        (ids::MFG_3, "Daegu Sun Care Works", FactoryType::Manufacturing, 30_000),
        (ids::CTN_1, "Clearform Bottles", FactoryType::Container, 120_000),
        (ids::CTN_2, "Tubeline Containers", FactoryType::Container, 90_000),
        (ids::PKG_1, "Foldwell Packaging", FactoryType::Packaging, 150_000),
        (ids::PKG_2, "Printbox Studio", FactoryType::Packaging, 80_000),
    ];
    for (id, name, factory_type, capacity) in factories {
        let mut factory = Factory::new(id, name, factory_type);
        factory.capacity = Some(capacity);
        if factory_type == FactoryType::Manufacturing {
            factory.certifications = vec!["ISO 22716".to_string()];
        }
        insert(db, stamped!(factory));
    }
}

fn seed_projects(db: &mut Database) {
    let serum = Project::new_master(ids::MASTER_SERUM, "Hydra Serum Line")
        .with_customer(ids::CUSTOMER_AURORA, "Aurora Cosmetics")
        .with_priority(Priority::High)
        .with_service_type(ServiceType::Oem)
        .with_dates(day(2, 1), day(6, 30));
    let sun = Project::new_master(ids::MASTER_SUN, "Sun Care Refresh")
        .with_customer(ids::CUSTOMER_HARBOR, "Blue Harbor Beauty")
        .with_priority(Priority::Medium)
        .with_service_type(ServiceType::Odm)
        .with_dates(day(3, 1), day(8, 29));

    let subs = [
        (
            &serum,
            ids::SUB_SERUM_30,
            "Hydra Serum 30ml",
            [ids::MFG_1, ids::CTN_1, ids::PKG_1],
            (day(2, 3), day(4, 30)),
            ProjectStatus::InProgress,
        ),
        (
            &serum,
            ids::SUB_SERUM_50,
            "Hydra Serum 50ml",
            [ids::MFG_2, ids::CTN_1, ids::PKG_2],
            (day(3, 3), day(6, 27)),
            ProjectStatus::Planning,
        ),
        (
            &sun,
            ids::SUB_SUN_STICK,
            "SPF50 Stick",
            [ids::MFG_3, ids::CTN_2, ids::PKG_1],
            (day(3, 3), day(5, 30)),
            ProjectStatus::Completed,
        ),
        (
            &sun,
            ids::SUB_SUN_LOTION,
            "SPF30 Lotion",
            [ids::MFG_1, ids::CTN_2, ids::PKG_2],
            (day(4, 1), day(8, 29)),
            ProjectStatus::Completed,
        ),
    ];

    for (master, id, name, [manufacturer, container, packaging], (start, end), status) in subs {
        let mut sub = Project::new_sub(id, master.id.as_str(), name)
            .with_priority(master.priority)
            .with_service_type(master.service_type)
            .with_factory(FactoryType::Manufacturing, manufacturer)
            .with_factory(FactoryType::Container, container)
            .with_factory(FactoryType::Packaging, packaging)
            .with_dates(start, end)
            .with_status(status);
        sub.customer_id.clone_from(&master.customer_id);
        sub.customer.clone_from(&master.customer);
        sub.product_type = Some("Skincare".to_string());
        insert(db, stamped!(sub));
    }
    insert(db, stamped!(serum));
    insert(db, stamped!(sun));
}

/// One schedule per SUB with three back-to-back phases
fn seed_schedules(db: &mut Database) {
    struct Plan<'a> {
        project: &'a str,
        factories: [&'a str; 3],
        phases: [(NaiveDate, NaiveDate, TaskStatus, u8); 3],
        participants: [&'a str; 2],
    }

    let plans = [
        Plan {
            project: ids::SUB_SERUM_30,
            factories: [ids::MFG_1, ids::CTN_1, ids::PKG_1],
            phases: [
                (day(2, 3), day(2, 28), TaskStatus::Completed, 100),
                (day(3, 3), day(3, 31), TaskStatus::InProgress, 50),
                (day(4, 1), day(4, 30), TaskStatus::Pending, 0),
            ],
            participants: [ids::MANAGER, ids::MANUFACTURING_MANAGER],
        },
        Plan {
            project: ids::SUB_SERUM_50,
            factories: [ids::MFG_2, ids::CTN_1, ids::PKG_2],
            phases: [
                (day(3, 3), day(4, 11), TaskStatus::Pending, 0),
                (day(4, 14), day(5, 16), TaskStatus::Pending, 0),
                (day(5, 19), day(6, 27), TaskStatus::Pending, 0),
            ],
            participants: [ids::MANAGER, ids::PACKAGING_MANAGER],
        },
        Plan {
            project: ids::SUB_SUN_STICK,
            factories: [ids::MFG_3, ids::CTN_2, ids::PKG_1],
            phases: [
                (day(3, 3), day(3, 31), TaskStatus::Completed, 100),
                (day(4, 1), day(4, 30), TaskStatus::Completed, 100),
                (day(5, 1), day(5, 30), TaskStatus::Completed, 100),
            ],
            participants: [ids::MANAGER, ids::MANUFACTURING_MANAGER],
        },
        Plan {
            project: ids::SUB_SUN_LOTION,
            factories: [ids::MFG_1, ids::CTN_2, ids::PKG_2],
            phases: [
                (day(4, 1), day(5, 30), TaskStatus::Completed, 100),
                (day(6, 2), day(7, 11), TaskStatus::Completed, 100),
                (day(7, 14), day(8, 29), TaskStatus::Completed, 100),
            ],
            participants: [ids::MANAGER, ids::PACKAGING_MANAGER],
        },
    ];

    let titles = ["Formulation", "Container sampling", "Packaging design"];
    let roles = [
        FactoryType::Manufacturing,
        FactoryType::Container,
        FactoryType::Packaging,
    ];

    for plan in plans {
        let schedule_id = plan.project.replacen("project-", "schedule-", 1);
        let mut schedule = Schedule::new(schedule_id.as_str(), plan.project);
        schedule.name = Some("Production schedule".to_string());
        insert(db, stamped!(schedule));

        let mut previous: Option<String> = None;
        for (phase, (start, end, status, progress)) in plan.phases.into_iter().enumerate() {
            let task_id = format!("{}-{}", schedule_id.replacen("schedule-", "task-", 1), phase + 1);
            let mut task = Task::new(task_id.as_str(), schedule_id.as_str(), titles[phase], start, end)
                .with_status(status, progress);
            let mut assignment = FactoryAssignment::new(plan.factories[phase], roles[phase]);
            assignment.status = status;
            assignment.progress = progress;
            assignment.start_date = Some(start);
            assignment.end_date = Some(end);
            task.factory_assignments.push(assignment);
            task.participants = plan.participants.iter().map(ToString::to_string).collect();
            if let Some(previous) = previous.replace(task_id) {
                task.depends_on.push(previous);
            }
            insert(db, stamped!(task));
        }
    }
}

fn seed_comments(db: &mut Database) {
    let author = |db: &Database, user_id: &str| {
        db.users.get(user_id).map_or_else(
            || CommentAuthor {
                name: user_id.to_string(),
                email: None,
            },
            |user| CommentAuthor {
                name: user.name.clone(),
                email: Some(user.email.clone()),
            },
        )
    };
    let comments = [
        (
            "comment-kickoff",
            ids::MASTER_SERUM,
            ids::MANAGER,
            "Kickoff done. Formulation brief is shared with Hanul.",
            None,
        ),
        (
            "comment-kickoff-reply",
            ids::MASTER_SERUM,
            ids::MANUFACTURING_MANAGER,
            "First lab batch is scheduled for next week.",
            Some("comment-kickoff"),
        ),
        (
            "comment-stick-approved",
            ids::SUB_SUN_STICK,
            ids::CUSTOMER_USER,
            "Final stick samples approved.",
            None,
        ),
    ];

    for (offset, (id, project_id, user_id, content, parent_id)) in
        (0_i64..).zip(comments.into_iter())
    {
        let mut comment = Comment {
            id: id.to_string(),
            project_id: project_id.to_string(),
            user_id: user_id.to_string(),
            author: author(db, user_id),
            content: content.to_string(),
            parent_id: parent_id.map(str::to_string),
            reactions: Default::default(),
            attachments: Vec::new(),
            created_at: seeded_at() + Duration::hours(offset),
            updated_at: None,
        };
        if id == "comment-stick-approved" {
            comment.reactions.insert(
                "🎉".to_string(),
                vec![ReactionUser {
                    user_id: ids::MANAGER.to_string(),
                    name: "Jun Seo".to_string(),
                }],
            );
        }
        insert(db, comment);
    }
}

fn seed_catalog(db: &mut Database) {
    let categories = [
        ("category-skincare", "Skincare", None, 1),
        ("category-serum", "Serums", Some("category-skincare"), 1),
        ("category-suncare", "Sun care", None, 2),
    ];
    for (id, name, parent, sort_order) in categories {
        let mut category = ProductCategory::new(id, name, parent);
        category.sort_order = sort_order;
        insert(db, stamped!(category));
    }

    let products = [
        ("product-serum-30", "Hydra Serum 30ml", "category-serum", "HS-030"),
        ("product-serum-50", "Hydra Serum 50ml", "category-serum", "HS-050"),
        ("product-spf-stick", "SPF50 Stick", "category-suncare", "SC-S50"),
    ];
    for (id, name, category_id, code) in products {
        let mut product = Product::new(id, name, category_id);
        product.code = Some(code.to_string());
        insert(db, stamped!(product));
    }
}

fn seed_relations(db: &mut Database) {
    let user_factories = [
        UserFactory::new("uf-mfg-1", ids::MANUFACTURING_MANAGER, ids::MFG_1, MemberRole::Manager),
        UserFactory::new("uf-mfg-3", ids::MANUFACTURING_MANAGER, ids::MFG_3, MemberRole::Member),
        UserFactory::new("uf-pkg-1", ids::PACKAGING_MANAGER, ids::PKG_1, MemberRole::Manager),
    ];
    for mut link in user_factories {
        link.assigned_at = seeded_at();
        link.assigned_by = Some(ids::ADMIN.to_string());
        insert(db, link);
    }

    for (id, project_id, user_id, role) in [
        ("pa-serum-owner", ids::MASTER_SERUM, ids::MANAGER, MemberRole::Owner),
        ("pa-serum-viewer", ids::MASTER_SERUM, ids::CUSTOMER_USER, MemberRole::Viewer),
        ("pa-sun-owner", ids::MASTER_SUN, ids::MANAGER, MemberRole::Owner),
    ] {
        let mut assignment = ProjectAssignment::new(id, project_id, user_id, role);
        assignment.assigned_at = seeded_at();
        insert(db, assignment);
    }

    let sub_ids: Vec<String> = db
        .projects
        .values()
        .filter(|project| project.is_sub())
        .map(|project| project.id.clone())
        .collect();
    for project_id in sub_ids {
        let links: Vec<(String, FactoryType)> = db.projects[&project_id]
            .all_factory_ids()
            .filter_map(|factory_id| {
                db.factories
                    .get(factory_id)
                    .map(|factory| (factory.id.clone(), factory.factory_type))
            })
            .collect();
        for (factory_id, role) in links {
            let id = format!(
                "fp-{}-{}",
                factory_id.trim_start_matches("factory-"),
                project_id.trim_start_matches("project-sub-")
            );
            let mut link = FactoryProject::new(id, factory_id, project_id.as_str(), role);
            link.assigned_at = seeded_at();
            insert(db, link);
        }
    }

    let mut customer_link =
        UserCustomer::new("uc-aurora", ids::CUSTOMER_USER, ids::CUSTOMER_AURORA, MemberRole::Owner);
    customer_link.assigned_at = seeded_at();
    insert(db, customer_link);
}

fn seed_mappings(db: &mut Database) {
    let statuses = [
        ("PLANNING", "Planning", "#9e9e9e"),
        ("IN_PROGRESS", "In progress", "#1e88e5"),
        ("ON_HOLD", "On hold", "#fb8c00"),
        ("COMPLETED", "Completed", "#43a047"),
        ("CANCELLED", "Cancelled", "#e53935"),
    ];
    for (order, (code, label, color)) in (1_u32..).zip(statuses) {
        let id = format!("status-{}", code.to_lowercase());
        insert(db, StatusMapping::new(id, code, label, order).with_color(color));
    }

    for (order, (code, label)) in (1_u32..).zip([("HIGH", "High"), ("MEDIUM", "Medium"), ("LOW", "Low")]) {
        let id = format!("priority-{}", code.to_lowercase());
        insert(db, PriorityMapping::new(id, code, label, order));
    }

    let service_types = [
        ("OEM", "OEM"),
        ("ODM", "ODM"),
        ("OBM", "OBM"),
        ("OTHER", "Other"),
    ];
    for (order, (code, label)) in (1_u32..).zip(service_types) {
        let id = format!("service-{}", code.to_lowercase());
        insert(db, ServiceTypeMapping::new(id, code, label, order));
    }

    let project_types = [("MASTER", "Master project"), ("SUB", "Sub project"), ("TASK", "Task")];
    for (order, (code, label)) in (1_u32..).zip(project_types) {
        let id = format!("ptype-{}", code.to_lowercase());
        insert(db, ProjectTypeMapping::new(id, code, label, order));
    }

    let mut theme = UiSetting::new("setting-theme", "theme", json!("light"));
    theme.updated_at = seeded_at();
    insert(db, theme);
}

fn seed_custom_fields(db: &mut Database) {
    let rules = ValidationRules {
        min: Some(6.0),
        max: Some(60.0),
        ..ValidationRules::default()
    };
    let mut shelf_life = CustomFieldDefinition::new(
        ids::SHELF_LIFE_FIELD,
        "shelf_life_months",
        CustomFieldType::Number,
        EntityKind::Project,
    )
    .with_rules(rules)
    .with_default(FieldValue::Number(24.0));
    shelf_life.label = "Shelf life (months)".to_string();
    insert(db, stamped!(shelf_life));

    insert(
        db,
        CustomFieldValue {
            id: "cfv-serum-shelf-life".to_string(),
            definition_id: ids::SHELF_LIFE_FIELD.to_string(),
            entity_kind: EntityKind::Project,
            entity_id: ids::MASTER_SERUM.to_string(),
            value: FieldValue::Number(36.0),
            updated_at: seeded_at(),
        },
    );
}

/// Apply MASTER aggregates in place, keeping the fixed timestamps
fn aggregate_masters(db: &mut Database) {
    let master_ids: Vec<String> = db
        .projects
        .values()
        .filter(|project| project.is_master())
        .map(|project| project.id.clone())
        .collect();
    for master_id in master_ids {
        let Some(master) = db.projects.get(&master_id) else {
            continue;
        };
        let patch = compute_master_aggregate(master, &sub_projects_of(db, &master_id));
        if let (Some(patch), Some(master)) = (patch, db.projects.get_mut(&master_id)) {
            patch.apply(master);
        }
    }
}
