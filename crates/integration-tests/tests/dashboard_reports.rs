use chrono::{Datelike, Utc};
use domains::{DomainError, NewTicket, TicketPatch, TicketStatus};
use integration_tests::TestApp;

fn current_month() -> String {
    let now = Utc::now();
    format!("{:04}-{:02}", now.year(), now.month())
}

#[tokio::test]
async fn month_data_counts_new_and_closed_in_the_current_month() {
    let app = TestApp::new().await;
    let first = app.open_ticket(&app.customer, "One").await;
    app.open_ticket(&app.customer, "Two").await;
    let gone = app.open_ticket(&app.customer, "Three").await;
    app.tickets.soft_delete(gone.id, &app.admin).await.unwrap();

    app.tickets
        .update(
            first.id,
            TicketPatch {
                status: Some(TicketStatus::Closed),
                closed_date: Some(Some(Utc::now())),
                ..TicketPatch::default()
            },
            &app.agent,
        )
        .await
        .unwrap();

    let months = app.tickets.month_data(Utc::now()).await.unwrap();
    assert_eq!(months.len(), 12);
    let last = months.last().unwrap();
    assert_eq!(last.month, current_month());
    assert_eq!(last.new_count, 2);
    assert_eq!(last.closed_count, 1);
    assert!(months[..11].iter().all(|m| m.new_count == 0 && m.closed_count == 0));
}

#[tokio::test]
async fn closing_by_status_alone_does_not_count_as_closed() {
    let app = TestApp::new().await;
    let ticket = app.open_ticket(&app.customer, "Status only").await;
    app.tickets
        .update(
            ticket.id,
            TicketPatch { status: Some(TicketStatus::Closed), ..TicketPatch::default() },
            &app.agent,
        )
        .await
        .unwrap();

    let months = app.tickets.month_data(Utc::now()).await.unwrap();
    assert_eq!(months.last().unwrap().closed_count, 0);
}

#[tokio::test]
async fn year_data_has_twelve_calendar_months() {
    let app = TestApp::new().await;
    app.open_ticket(&app.customer, "This year").await;

    let year = Utc::now().year();
    let months = app.tickets.year_data(year).await.unwrap();
    assert_eq!(months.len(), 12);
    assert_eq!(months[0].month, format!("{year:04}-01"));
    assert_eq!(months[11].month, format!("{year:04}-12"));
    assert_eq!(months.iter().map(|m| m.new_count).sum::<u64>(), 1);

    let last_year = app.tickets.year_data(year - 1).await.unwrap();
    assert!(last_year.iter().all(|m| m.new_count == 0));

    assert!(matches!(
        app.tickets.year_data(0).await.unwrap_err(),
        DomainError::Validation(_)
    ));
}

#[tokio::test]
async fn top_groups_rank_by_ticket_count() {
    let app = TestApp::new().await;
    let billing = app
        .accounts
        .create_group("Billing", vec![app.admin.id])
        .await
        .unwrap();

    app.open_ticket(&app.customer, "Support one").await;
    app.open_ticket(&app.customer, "Support two").await;
    app.tickets
        .create(
            &app.admin,
            NewTicket {
                subject: "Invoice".into(),
                group: Some(billing.id),
                ..NewTicket::default()
            },
        )
        .await
        .unwrap();

    let all = app.tickets.top_groups(5, None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].name, "Support");
    assert_eq!(all[0].count, 2);
    assert_eq!(all[1].group_id, billing.id);
    assert_eq!(all[1].count, 1);

    let top_one = app.tickets.top_groups(1, Some(30)).await.unwrap();
    assert_eq!(top_one.len(), 1);
    assert_eq!(top_one[0].group_id, app.support.id);

    assert!(app.tickets.top_groups(0, None).await.is_err());
}

#[tokio::test]
async fn top_groups_with_an_unbounded_timespan_counts_everything() {
    let app = TestApp::new().await;
    app.open_ticket(&app.customer, "Old").await;
    app.open_ticket(&app.customer, "New").await;

    let top = app.tickets.top_groups(5, Some(u32::MAX)).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].group_id, app.support.id);
    assert_eq!(top[0].count, 2);
}
