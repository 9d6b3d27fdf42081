use ledger_core::{
    BillItemListQuery, BillItemRepository, BillType, BillingError, BillingWorkflow,
    OperationContext, RecordBillRequest, RepoError, RepoResult, ReplicatedStore,
    RoutingDecision, SqliteBillItemRepository, SqliteUserRepository, TransactionCoordinator,
    User, UserId, UserListQuery, UserRepository, ValidationError,
};

const D1: i64 = 1_700_000_000_000;
const D2: i64 = 1_700_086_400_000;

/// Store with user 7 ("seven") and category 3 ("food") on the primary.
fn seeded_store() -> ReplicatedStore {
    let store = ReplicatedStore::open_in_memory().unwrap();
    store
        .execute(RoutingDecision::Primary, None, |conn| {
            conn.execute_batch(
                "INSERT INTO users (id, username) VALUES (7, 'seven');
                 INSERT INTO users (id, username) VALUES (8, 'eight');
                 INSERT INTO bill_categories (id, name) VALUES (3, 'food');",
            )
        })
        .unwrap();
    store
}

fn request(user_id: UserId, bill_type: BillType, bill_date: i64, amount: i64) -> RecordBillRequest {
    RecordBillRequest {
        user_id,
        category_id: 3,
        bill_type,
        bill_date,
        amount,
        description: Some("x".to_string()),
    }
}

fn items_on_primary(store: &ReplicatedStore) -> usize {
    SqliteBillItemRepository::new(store)
        .list_items(
            &OperationContext::new(),
            &BillItemListQuery::default(),
            true,
        )
        .unwrap()
        .len()
}

fn user_on_primary(store: &ReplicatedStore, id: UserId) -> User {
    SqliteUserRepository::new(store)
        .load_user(&OperationContext::new(), id, true)
        .unwrap()
        .unwrap()
}

#[test]
fn single_expense_sets_totals_and_latest_items() {
    let store = seeded_store();
    let workflow = BillingWorkflow::sqlite(&store);

    let result = workflow
        .record_bill(&request(7, BillType::Expense, D1, 500))
        .unwrap();

    assert_eq!(result.user_id(), 7);
    assert_eq!(result.username(), "seven");
    assert_eq!(result.total_expense(), 500);
    assert_eq!(result.total_income(), 0);
    let last_expense = result.last_expense().unwrap();
    assert_eq!(last_expense.amount, 500);
    assert_eq!(last_expense.bill_date, D1);
    assert_eq!(last_expense.description.as_deref(), Some("x"));
    assert!(result.last_income().is_none());

    assert_eq!(user_on_primary(&store, 7).last_bill_time, Some(D1));
}

#[test]
fn consecutive_expenses_accumulate_and_track_latest_date() {
    let store = seeded_store();
    let workflow = BillingWorkflow::sqlite(&store);

    workflow
        .record_bill(&request(7, BillType::Expense, D1, 500))
        .unwrap();
    let result = workflow
        .record_bill(&request(7, BillType::Expense, D2, 300))
        .unwrap();

    assert_eq!(result.total_expense(), 800);
    assert_eq!(result.last_expense().unwrap().bill_date, D2);
    assert_eq!(result.last_expense().unwrap().amount, 300);
    assert_eq!(user_on_primary(&store, 7).last_bill_time, Some(D2));
}

#[test]
fn income_and_expense_totals_are_separate() {
    let store = seeded_store();
    let workflow = BillingWorkflow::sqlite(&store);

    workflow
        .record_bill(&request(7, BillType::Expense, D1, 250))
        .unwrap();
    let result = workflow
        .record_bill(&request(7, BillType::Income, D2, 4_000))
        .unwrap();

    assert_eq!(result.total_expense(), 250);
    assert_eq!(result.total_income(), 4_000);
    assert_eq!(result.last_income().unwrap().amount, 4_000);
    assert_eq!(result.last_expense().unwrap().amount, 250);
}

#[test]
fn totals_ignore_other_users() {
    let store = seeded_store();
    let workflow = BillingWorkflow::sqlite(&store);

    workflow
        .record_bill(&request(8, BillType::Expense, D1, 999))
        .unwrap();
    let result = workflow
        .record_bill(&request(7, BillType::Expense, D1, 10))
        .unwrap();

    assert_eq!(result.total_expense(), 10);
}

#[test]
fn record_bill_never_reads_from_the_replica() {
    let store = seeded_store();
    let workflow = BillingWorkflow::sqlite(&store);

    workflow
        .record_bill(&request(7, BillType::Expense, D1, 500))
        .unwrap();

    assert_eq!(store.dispatch_count(RoutingDecision::Replica), 0);
}

#[test]
fn unknown_user_rolls_back_and_reports_db_error() {
    let store = seeded_store();
    let workflow = BillingWorkflow::sqlite(&store);

    let err = workflow
        .record_bill(&request(999, BillType::Expense, D1, 500))
        .unwrap_err();

    assert!(matches!(err.repo_cause(), Some(RepoError::Db(_))));
    assert_eq!(items_on_primary(&store), 0);
}

#[test]
fn invalid_request_touches_no_storage() {
    let store = seeded_store();
    let workflow = BillingWorkflow::sqlite(&store);
    let primary_before = store.dispatch_count(RoutingDecision::Primary);

    let err = workflow
        .record_bill(&request(7, BillType::Expense, D1, -5))
        .unwrap_err();

    assert!(matches!(
        err,
        BillingError::Validation(ValidationError::NegativeAmount(-5))
    ));
    assert!(err.repo_cause().is_none());
    assert_eq!(store.dispatch_count(RoutingDecision::Primary), primary_before);
    assert_eq!(store.dispatch_count(RoutingDecision::Replica), 0);
}

#[test]
fn largest_amount_is_accepted() {
    let store = seeded_store();
    let result = BillingWorkflow::sqlite(&store)
        .record_bill(&request(7, BillType::Income, D1, i64::MAX))
        .unwrap();

    assert_eq!(result.total_income(), i64::MAX);
    assert_eq!(result.total_expense(), 0);
}

#[test]
fn overflowing_total_rolls_back_instead_of_panicking() {
    let store = seeded_store();
    let workflow = BillingWorkflow::sqlite(&store);
    workflow
        .record_bill(&request(7, BillType::Expense, D1, i64::MAX))
        .unwrap();

    let err = workflow
        .record_bill(&request(7, BillType::Expense, D2, 1))
        .unwrap_err();

    assert!(matches!(
        err.repo_cause(),
        Some(RepoError::Validation(ValidationError::TotalOverflow(BillType::Expense)))
    ));
    assert_eq!(items_on_primary(&store), 1);
    assert_eq!(user_on_primary(&store, 7).last_bill_time, Some(D1));

    // Any later bill recomputes the full expense total, so it is refused too.
    let income_err = workflow
        .record_bill(&request(7, BillType::Income, D2, 5))
        .unwrap_err();
    assert!(matches!(
        income_err.repo_cause(),
        Some(RepoError::Validation(ValidationError::TotalOverflow(BillType::Expense)))
    ));
}

/// User repository whose updates always fail, to break the workflow midway.
struct FailingUserUpdates<'store> {
    inner: SqliteUserRepository<'store>,
}

impl UserRepository for FailingUserUpdates<'_> {
    fn create_user(&self, ctx: &OperationContext<'_>, user: &User) -> RepoResult<UserId> {
        self.inner.create_user(ctx, user)
    }

    fn update_user(&self, _ctx: &OperationContext<'_>, _user: &User) -> RepoResult<UserId> {
        Err(RepoError::InvalidData("injected update failure".to_string()))
    }

    fn delete_user(&self, ctx: &OperationContext<'_>, id: UserId) -> RepoResult<usize> {
        self.inner.delete_user(ctx, id)
    }

    fn load_user(
        &self,
        ctx: &OperationContext<'_>,
        id: UserId,
        primary: bool,
    ) -> RepoResult<Option<User>> {
        self.inner.load_user(ctx, id, primary)
    }

    fn list_users(
        &self,
        ctx: &OperationContext<'_>,
        query: &UserListQuery,
        primary: bool,
    ) -> RepoResult<Vec<User>> {
        self.inner.list_users(ctx, query, primary)
    }
}

#[test]
fn failure_after_insert_rolls_back_the_new_item() {
    let store = seeded_store();
    let workflow = BillingWorkflow::new(
        TransactionCoordinator::new(&store),
        FailingUserUpdates {
            inner: SqliteUserRepository::new(&store),
        },
        SqliteBillItemRepository::new(&store),
    );

    let err = workflow
        .record_bill(&request(7, BillType::Expense, D1, 500))
        .unwrap_err();

    assert!(matches!(
        err.repo_cause(),
        Some(RepoError::InvalidData(message)) if message.contains("injected")
    ));
    assert_eq!(items_on_primary(&store), 0);
    assert_eq!(user_on_primary(&store, 7).last_bill_time, None);

    // The store is usable again once the failed transaction is gone.
    let result = BillingWorkflow::sqlite(&store)
        .record_bill(&request(7, BillType::Expense, D2, 20))
        .unwrap();
    assert_eq!(result.total_expense(), 20);
}

#[test]
fn concurrent_recordings_for_different_users() {
    let store = seeded_store();

    std::thread::scope(|scope| {
        for user_id in [7, 8] {
            let store = &store;
            scope.spawn(move || {
                let workflow = BillingWorkflow::sqlite(store);
                for day in 0..10 {
                    workflow
                        .record_bill(&request(user_id, BillType::Expense, D1 + day, user_id))
                        .unwrap();
                }
            });
        }
    });

    let workflow = BillingWorkflow::sqlite(&store);
    let seven = workflow
        .record_bill(&request(7, BillType::Income, D2, 1))
        .unwrap();
    let eight = workflow
        .record_bill(&request(8, BillType::Income, D2, 1))
        .unwrap();
    assert_eq!(seven.total_expense(), 70);
    assert_eq!(eight.total_expense(), 80);
    assert_eq!(seven.last_expense().unwrap().bill_date, D1 + 9);
}

#[test]
fn result_serializes_with_camel_case_keys() {
    let store = seeded_store();
    let result = BillingWorkflow::sqlite(&store)
        .record_bill(&request(7, BillType::Expense, D1, 500))
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["totalExpense"], 500);
    assert_eq!(json["totalIncome"], 0);
    assert!(json["lastIncome"].is_null());
    assert_eq!(json["lastExpense"]["bill_type"], "expense");
}
