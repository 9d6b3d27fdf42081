use ledger_core::{
    BillCategory, BillCategoryRepository, BillItem, BillItemListQuery, BillItemRepository,
    BillType, CategoryListQuery, EntityKind, OperationContext, RepoError, ReplicatedStore,
    RoutingDecision, SqliteBillCategoryRepository, SqliteBillItemRepository,
    SqliteUserRepository, User, UserListQuery, UserRepository, ValidationError,
};

const DAY_MS: i64 = 86_400_000;

fn store() -> ReplicatedStore {
    ReplicatedStore::open_in_memory().unwrap()
}

fn counts(store: &ReplicatedStore) -> (u64, u64) {
    (
        store.dispatch_count(RoutingDecision::Primary),
        store.dispatch_count(RoutingDecision::Replica),
    )
}

#[test]
fn writes_go_to_primary_and_reads_default_to_replica() {
    let store = store();
    let users = SqliteUserRepository::new(&store);
    let ctx = OperationContext::new();

    let id = users.create_user(&ctx, &User::new("alice")).unwrap();
    assert_eq!(counts(&store), (1, 0));

    // Replica has not been synced yet.
    assert!(users.load_user(&ctx, id, false).unwrap().is_none());
    assert_eq!(counts(&store), (1, 1));

    let loaded = users.load_user(&ctx, id, true).unwrap().unwrap();
    assert_eq!(loaded.username, "alice");
    assert_eq!(counts(&store), (2, 1));
}

#[test]
fn replica_catches_up_after_sync() {
    let store = store();
    let users = SqliteUserRepository::new(&store);
    let ctx = OperationContext::new();

    let id = users.create_user(&ctx, &User::new("bob")).unwrap();
    store.sync_replica().unwrap();

    let loaded = users.load_user(&ctx, id, false).unwrap().unwrap();
    assert_eq!(loaded.id, Some(id));
    assert_eq!(loaded.username, "bob");
}

#[test]
fn routing_decision_is_cleared_after_every_call() {
    let store = store();
    let users = SqliteUserRepository::new(&store);
    let ctx = OperationContext::new();

    let id = users.create_user(&ctx, &User::new("carol")).unwrap();
    assert_eq!(ctx.routing().current(), RoutingDecision::Replica);

    users.load_user(&ctx, id, true).unwrap();
    assert_eq!(ctx.routing().current(), RoutingDecision::Replica);

    let err = users
        .update_user(
            &ctx,
            &User {
                id: Some(999_999),
                ..User::new("ghost")
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
    assert_eq!(ctx.routing().current(), RoutingDecision::Replica);
    assert!(!ctx.routing().is_pinned());
}

#[test]
fn update_missing_user_returns_not_found() {
    let store = store();
    let users = SqliteUserRepository::new(&store);
    let ctx = OperationContext::new();

    let err = users
        .update_user(
            &ctx,
            &User {
                id: Some(999_999),
                ..User::new("nobody")
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::User,
            id: 999_999
        }
    ));
}

#[test]
fn update_missing_category_leaves_storage_untouched() {
    let store = store();
    let categories = SqliteBillCategoryRepository::new(&store);
    let ctx = OperationContext::new();
    categories
        .create_category(&ctx, &BillCategory::new("food"))
        .unwrap();

    let err = categories
        .update_category(
            &ctx,
            &BillCategory {
                id: Some(999_999),
                ..BillCategory::new("renamed")
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::BillCategory,
            id: 999_999
        }
    ));

    let names: Vec<String> = categories
        .list_categories(&ctx, &CategoryListQuery::default(), true)
        .unwrap()
        .into_iter()
        .map(|category| category.name)
        .collect();
    assert_eq!(names, vec!["food"]);
}

#[test]
fn update_without_id_is_rejected_before_dispatch() {
    let store = store();
    let users = SqliteUserRepository::new(&store);

    let err = users
        .update_user(&OperationContext::new(), &User::new("unsaved"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::MissingId("user"))
    ));
    assert_eq!(counts(&store), (0, 0));
}

#[test]
fn blank_username_is_rejected_before_dispatch() {
    let store = store();
    let users = SqliteUserRepository::new(&store);

    let err = users
        .create_user(&OperationContext::new(), &User::new("  "))
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(counts(&store), (0, 0));
}

#[test]
fn load_missing_id_returns_none_on_both_targets() {
    let store = store();
    let items = SqliteBillItemRepository::new(&store);
    let ctx = OperationContext::new();

    assert!(items.load_item(&ctx, 424_242, false).unwrap().is_none());
    assert!(items.load_item(&ctx, 424_242, true).unwrap().is_none());
}

#[test]
fn delete_reports_affected_rows() {
    let store = store();
    let categories = SqliteBillCategoryRepository::new(&store);
    let ctx = OperationContext::new();

    let id = categories
        .create_category(&ctx, &BillCategory::new("rent"))
        .unwrap();
    assert_eq!(categories.delete_category(&ctx, id).unwrap(), 1);
    assert_eq!(categories.delete_category(&ctx, id).unwrap(), 0);
}

#[test]
fn user_list_filters_by_pattern() {
    let store = store();
    let users = SqliteUserRepository::new(&store);
    let ctx = OperationContext::new();

    for name in ["anna", "andrew", "zoe"] {
        users.create_user(&ctx, &User::new(name)).unwrap();
    }

    let query = UserListQuery {
        username: Some("an%".to_string()),
        ..UserListQuery::default()
    };
    let names: Vec<String> = users
        .list_users(&ctx, &query, true)
        .unwrap()
        .into_iter()
        .map(|user| user.username)
        .collect();
    assert_eq!(names, vec!["anna".to_string(), "andrew".to_string()]);
}

#[test]
fn categories_list_in_sort_order() {
    let store = store();
    let categories = SqliteBillCategoryRepository::new(&store);
    let ctx = OperationContext::new();

    for (name, sort_order) in [("salary", 2), ("food", 1), ("travel", 1)] {
        let category = BillCategory {
            sort_order,
            ..BillCategory::new(name)
        };
        categories.create_category(&ctx, &category).unwrap();
    }

    let names: Vec<String> = categories
        .list_categories(&ctx, &CategoryListQuery::default(), true)
        .unwrap()
        .into_iter()
        .map(|category| category.name)
        .collect();
    assert_eq!(names, vec!["food", "travel", "salary"]);

    let filtered = categories
        .list_categories(
            &ctx,
            &CategoryListQuery {
                name: Some("sal%".to_string()),
            },
            true,
        )
        .unwrap();
    assert_eq!(filtered.len(), 1);
}

#[test]
fn bill_item_queries_filter_and_order_by_date() {
    let store = store();
    let ctx = OperationContext::new();
    let user_id = SqliteUserRepository::new(&store)
        .create_user(&ctx, &User::new("dana"))
        .unwrap();
    let category_id = SqliteBillCategoryRepository::new(&store)
        .create_category(&ctx, &BillCategory::new("food"))
        .unwrap();
    let items = SqliteBillItemRepository::new(&store);

    let base = 1_700_000_000_000;
    let mut ids = Vec::new();
    for (offset, bill_type, amount) in [
        (0, BillType::Expense, 100),
        (2, BillType::Expense, 300),
        (1, BillType::Income, 1_000),
        (1, BillType::Expense, 200),
    ] {
        let item = BillItem::new(user_id, category_id, bill_type, base + offset * DAY_MS, amount);
        ids.push(items.create_item(&ctx, &item).unwrap());
    }

    let expenses = items
        .list_items(&ctx, &BillItemListQuery::for_user(user_id, BillType::Expense), true)
        .unwrap();
    let amounts: Vec<i64> = expenses.iter().map(|item| item.amount).collect();
    assert_eq!(amounts, vec![300, 200, 100]);

    let window = BillItemListQuery {
        user_id: Some(user_id),
        start_date: Some(base + DAY_MS),
        end_date: Some(base + DAY_MS),
        ..BillItemListQuery::default()
    };
    assert_eq!(items.list_items(&ctx, &window, true).unwrap().len(), 2);

    let latest = items
        .latest_item(&ctx, user_id, BillType::Expense, true)
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, Some(ids[1]));
    assert_eq!(latest.bill_date, base + 2 * DAY_MS);

    let latest_income = items
        .latest_item(&ctx, user_id, BillType::Income, true)
        .unwrap()
        .unwrap();
    assert_eq!(latest_income.amount, 1_000);
}

#[test]
fn latest_item_is_none_without_matching_rows() {
    let store = store();
    let items = SqliteBillItemRepository::new(&store);

    let latest = items
        .latest_item(&OperationContext::new(), 7, BillType::Income, true)
        .unwrap();
    assert!(latest.is_none());
}

#[test]
fn bill_item_for_unknown_user_fails_with_db_error() {
    let store = store();
    let items = SqliteBillItemRepository::new(&store);

    let item = BillItem::new(7, 3, BillType::Expense, 0, 500);
    let err = items
        .create_item(&OperationContext::new(), &item)
        .unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
}

#[test]
fn bill_item_update_rewrites_row() {
    let store = store();
    let ctx = OperationContext::new();
    let user_id = SqliteUserRepository::new(&store)
        .create_user(&ctx, &User::new("erin"))
        .unwrap();
    let category_id = SqliteBillCategoryRepository::new(&store)
        .create_category(&ctx, &BillCategory::new("misc"))
        .unwrap();
    let items = SqliteBillItemRepository::new(&store);

    let mut item = BillItem::new(user_id, category_id, BillType::Expense, 10, 50);
    item.id = Some(items.create_item(&ctx, &item).unwrap());
    item.amount = 75;
    item.bill_type = BillType::Income;
    item.description = Some("refund".to_string());
    items.update_item(&ctx, &item).unwrap();

    let loaded = items
        .load_item(&ctx, item.id.unwrap(), true)
        .unwrap()
        .unwrap();
    assert_eq!(loaded, item);
}

#[test]
fn corrupt_bill_type_is_reported_as_invalid_data() {
    let store = store();
    let ctx = OperationContext::new();
    let user_id = SqliteUserRepository::new(&store)
        .create_user(&ctx, &User::new("frank"))
        .unwrap();
    let category_id = SqliteBillCategoryRepository::new(&store)
        .create_category(&ctx, &BillCategory::new("misc"))
        .unwrap();
    let items = SqliteBillItemRepository::new(&store);
    let id = items
        .create_item(
            &ctx,
            &BillItem::new(user_id, category_id, BillType::Expense, 0, 1),
        )
        .unwrap();

    store
        .execute(RoutingDecision::Primary, None, |conn| {
            conn.execute_batch(
                "PRAGMA ignore_check_constraints = ON;
                 UPDATE bill_items SET bill_type = 'refund';
                 PRAGMA ignore_check_constraints = OFF;",
            )
        })
        .unwrap();

    let err = items.load_item(&ctx, id, true).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(message) if message.contains("refund")));
}
