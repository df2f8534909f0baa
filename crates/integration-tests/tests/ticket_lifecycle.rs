//! Ticket operations across services, memory storage, local attachment
//! storage and the broadcast bus.

use bytes::Bytes;
use domains::{
    DomainError, NewComment, NewTicket, SubscriptionChange, TagList, TicketEvent, TicketFilter,
    TicketPatch, TicketRepository, TicketStatus,
};
use integration_tests::TestApp;

#[tokio::test]
async fn created_ticket_starts_with_one_history_entry_and_its_owner_subscribed() {
    let app = TestApp::new().await;
    let ticket = app
        .tickets
        .create(
            &app.customer,
            NewTicket {
                subject: "VPN drops".into(),
                issue: "It *keeps* dropping".into(),
                tags: Some(TagList::Delimited("a,b,c".into())),
                ..NewTicket::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(ticket.uid, 1000);
    assert_eq!(ticket.history.len(), 1);
    assert_eq!(ticket.subscribers.len(), 1);
    assert_eq!(ticket.subscribers[0].id, app.customer.id);
    assert_eq!(ticket.tags, vec!["a", "b", "c"]);
    assert_eq!(ticket.group.id, app.support.id);
    assert_eq!(ticket.ticket_type.id, app.issue_type.id);
    assert!(ticket.issue.contains("<em>keeps</em>"));

    let second = app.open_ticket(&app.customer, "Another").await;
    assert_eq!(second.uid, 1001);
}

#[tokio::test]
async fn subject_is_required() {
    let app = TestApp::new().await;
    let err = app
        .tickets
        .create(&app.customer, NewTicket { subject: "   ".into(), ..NewTicket::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn listing_is_scoped_to_member_groups_and_hides_deleted() {
    let app = TestApp::new().await;
    let first = app.open_ticket(&app.customer, "First").await;
    let second = app.open_ticket(&app.customer, "Second").await;

    let listed = app.tickets.list(&app.agent, TicketFilter::default()).await.unwrap();
    let uids: Vec<u64> = listed.tickets.iter().map(|t| t.uid).collect();
    assert_eq!(uids, vec![second.uid, first.uid]);
    assert_eq!(listed.total, 2);

    let outside = app.tickets.list(&app.outsider, TicketFilter::default()).await.unwrap();
    assert!(outside.tickets.is_empty());
    assert_eq!(outside.total, 0);

    app.tickets.soft_delete(first.id, &app.agent).await.unwrap();
    let listed = app.tickets.list(&app.agent, TicketFilter::default()).await.unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.tickets.len(), 1);
    assert_eq!(listed.tickets[0].uid, second.uid);

    // still in the store, just flagged
    let stored = app.repos.tickets.find_by_id(first.id).await.unwrap().unwrap();
    assert!(stored.deleted);
}

#[tokio::test]
async fn status_filter_and_paging() {
    let app = TestApp::new().await;
    for n in 0..3 {
        app.open_ticket(&app.customer, &format!("Ticket {n}")).await;
    }
    let open = app.open_ticket(&app.customer, "Opened").await;
    app.tickets
        .update(
            open.id,
            TicketPatch { status: Some(TicketStatus::Open), ..TicketPatch::default() },
            &app.agent,
        )
        .await
        .unwrap();

    let only_open = app
        .tickets
        .list(&app.agent, TicketFilter { status: Some("1".into()), ..TicketFilter::default() })
        .await
        .unwrap();
    assert_eq!(only_open.total, 1);
    assert_eq!(only_open.tickets[0].id, open.id);

    let page = app
        .tickets
        .list(&app.agent, TicketFilter { limit: Some(2), page: Some(1), ..TicketFilter::default() })
        .await
        .unwrap();
    assert_eq!(page.tickets.iter().map(|t| t.uid).collect::<Vec<_>>(), vec![1001, 1000]);
    assert_eq!(page.total, 4);

    let past_the_end = app
        .tickets
        .list(&app.agent, TicketFilter { limit: Some(2), page: Some(5), ..TicketFilter::default() })
        .await
        .unwrap();
    assert!(past_the_end.tickets.is_empty());
    assert_eq!(past_the_end.total, 4);
}

#[tokio::test]
async fn status_only_update_touches_nothing_else() {
    let app = TestApp::new().await;
    let before = app.open_ticket(&app.customer, "Printer").await;

    let after = app
        .tickets
        .update(
            before.id,
            TicketPatch { status: Some(TicketStatus::Pending), ..TicketPatch::default() },
            &app.agent,
        )
        .await
        .unwrap();

    assert_eq!(after.status, TicketStatus::Pending);
    assert_eq!(after.subject, before.subject);
    assert_eq!(after.issue, before.issue);
    assert_eq!(after.tags, before.tags);
    assert_eq!(after.priority, before.priority);
    assert_eq!(after.history.len(), 2);
    assert_eq!(after.history[1].action, "ticket:set:status");
    assert!(after.closed_date.is_none());
    assert_eq!(after.version, before.version + 1);
}

#[tokio::test]
async fn resending_an_escaped_subject_changes_nothing() {
    let app = TestApp::new().await;
    let before = app.open_ticket(&app.customer, "Mail & <calendar>").await;
    assert_eq!(before.subject, "Mail &amp; &lt;calendar&gt;");

    let after = app
        .tickets
        .update(
            before.id,
            TicketPatch { subject: Some(before.subject.clone()), ..TicketPatch::default() },
            &app.agent,
        )
        .await
        .unwrap();

    assert_eq!(after.subject, before.subject);
    assert_eq!(after.history.len(), before.history.len());
    assert_eq!(after.version, before.version);
}

#[tokio::test]
async fn stale_version_is_rejected() {
    let app = TestApp::new().await;
    let ticket = app.open_ticket(&app.customer, "Race").await;

    let patch = |status| TicketPatch {
        status: Some(status),
        version: Some(ticket.version),
        ..TicketPatch::default()
    };
    app.tickets
        .update(ticket.id, patch(TicketStatus::Open), &app.agent)
        .await
        .unwrap();
    let err = app
        .tickets
        .update(ticket.id, patch(TicketStatus::Closed), &app.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    let stored = app.repos.tickets.find_by_id(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::Open);
    assert_eq!(stored.history.len(), 2);
}

#[tokio::test]
async fn concurrent_writers_cannot_both_replace_the_same_revision() {
    let app = TestApp::new().await;
    let view = app.open_ticket(&app.customer, "Lost update").await;

    let mut first = app.repos.tickets.find_by_id(view.id).await.unwrap().unwrap();
    let mut second = first.clone();
    first.add_comment(app.agent.id, "one".into(), chrono::Utc::now());
    second.add_comment(app.admin.id, "two".into(), chrono::Utc::now());

    let expected = first.next_revision();
    app.repos.tickets.replace(&first, expected).await.unwrap();
    let expected = second.next_revision();
    let err = app.repos.tickets.replace(&second, expected).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    let stored = app.repos.tickets.find_by_id(view.id).await.unwrap().unwrap();
    assert_eq!(stored.comments.len(), 1);
    assert_eq!(stored.comments[0].text, "one");
}

#[tokio::test]
async fn comment_appends_once_and_bumps_updated() {
    let app = TestApp::new().await;
    let ticket = app.open_ticket(&app.customer, "Slow laptop").await;

    let after = app
        .tickets
        .post_comment(
            ticket.id,
            NewComment { comment: "Have you tried **rebooting**?".into(), owner_id: None },
            &app.agent,
        )
        .await
        .unwrap();

    assert_eq!(after.comments.len(), 1);
    assert_eq!(after.comments[0].owner.id, app.agent.id);
    assert!(after.comments[0].text.contains("<strong>rebooting</strong>"));
    assert_eq!(after.history.len(), ticket.history.len() + 1);
    let updated = after.updated.expect("updated is set");
    assert!(updated >= ticket.date);
}

#[tokio::test]
async fn commenting_on_behalf_needs_admin() {
    let app = TestApp::new().await;
    let ticket = app.open_ticket(&app.customer, "Phone").await;
    let on_behalf = |text: &str| NewComment {
        comment: text.into(),
        owner_id: Some(app.customer.id),
    };

    let err = app
        .tickets
        .post_comment(ticket.id, on_behalf("from support"), &app.agent)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized(_)));

    let after = app
        .tickets
        .post_comment(ticket.id, on_behalf("from admin"), &app.admin)
        .await
        .unwrap();
    assert_eq!(after.comments[0].owner.id, app.customer.id);
}

#[tokio::test]
async fn notes_are_hidden_from_plain_users() {
    let app = TestApp::new().await;
    let ticket = app.open_ticket(&app.customer, "Badge").await;

    let staff_view = app
        .tickets
        .post_note(ticket.id, "customer seems confused", &app.agent)
        .await
        .unwrap();
    assert_eq!(staff_view.notes.as_ref().map(Vec::len), Some(1));

    let customer_view = app.tickets.get_by_uid(ticket.uid, &app.customer).await.unwrap();
    assert!(customer_view.notes.is_none());

    let err = app
        .tickets
        .post_note(ticket.id, "sneaky", &app.customer)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized(_)));
}

#[tokio::test]
async fn subscribe_toggle_round_trips() {
    let app = TestApp::new().await;
    let ticket = app.open_ticket(&app.customer, "Monitor").await;
    let change = |subscribe| SubscriptionChange {
        user: app.agent.id,
        subscribe,
    };

    let on = app.tickets.subscribe(ticket.id, change(true), &app.agent).await.unwrap();
    assert_eq!(on.subscribers.len(), 2);
    let off = app.tickets.subscribe(ticket.id, change(false), &app.agent).await.unwrap();
    let ids: Vec<_> = off.subscribers.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![app.customer.id]);

    // unsubscribing twice leaves the document alone
    let again = app.tickets.subscribe(ticket.id, change(false), &app.agent).await.unwrap();
    assert_eq!(again.version, off.version);
}

#[tokio::test]
async fn attachments_are_written_and_removed_from_disk() {
    let app = TestApp::new().await;
    let ticket = app.open_ticket(&app.customer, "Screenshot").await;

    let with_file = app
        .tickets
        .add_attachment(
            ticket.id,
            "screen.png",
            mime::IMAGE_PNG,
            Bytes::from_static(b"\x89PNG fake"),
            &app.customer,
        )
        .await
        .unwrap();
    assert_eq!(with_file.attachments.len(), 1);
    let attachment = with_file.attachments[0].clone();
    assert_eq!(attachment.name, "screen.png");
    assert_eq!(attachment.size, 9);
    let on_disk = app.media_root.join(&attachment.path);
    assert!(on_disk.exists());

    let err = app
        .tickets
        .remove_attachment(ticket.id, attachment.id, &app.customer)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized(_)));

    let without = app
        .tickets
        .remove_attachment(ticket.id, attachment.id, &app.agent)
        .await
        .unwrap();
    assert!(without.attachments.is_empty());
    assert!(!on_disk.exists());

    let err = app
        .tickets
        .remove_attachment(ticket.id, attachment.id, &app.agent)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(..)));
}

#[tokio::test]
async fn lifecycle_events_reach_bus_listeners_in_order() {
    let app = TestApp::new().await;
    let mut events = app.bus.subscribe();

    let ticket = app.open_ticket(&app.customer, "Events").await;
    app.tickets
        .post_comment(
            ticket.id,
            NewComment { comment: "ack".into(), owner_id: None },
            &app.agent,
        )
        .await
        .unwrap();
    app.tickets
        .subscribe(
            ticket.id,
            SubscriptionChange { user: app.agent.id, subscribe: true },
            &app.agent,
        )
        .await
        .unwrap();
    app.tickets.soft_delete(ticket.id, &app.admin).await.unwrap();

    let mut names = Vec::new();
    for _ in 0..4 {
        let event = events.recv().await.unwrap();
        assert_eq!(event.ticket_uid(), ticket.uid);
        names.push(event.name());
    }
    assert_eq!(
        names,
        vec![
            "ticket:created",
            "ticket:comment:added",
            "ticket:subscribers:update",
            "ticket:deleted"
        ]
    );
}

#[tokio::test]
async fn restore_brings_a_ticket_back_for_moderators_only() {
    let app = TestApp::new().await;
    let ticket = app.open_ticket(&app.customer, "Oops").await;
    let mut events = app.bus.subscribe();
    app.tickets.soft_delete(ticket.id, &app.customer).await.unwrap();
    assert!(matches!(events.recv().await.unwrap(), TicketEvent::Deleted { .. }));

    let err = app.tickets.restore(ticket.id, &app.agent).await.unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized(_)));

    let restored = app.tickets.restore(ticket.id, &app.admin).await.unwrap();
    assert!(!restored.deleted);
    assert_eq!(app.tickets.list(&app.agent, TicketFilter::default()).await.unwrap().total, 1);
}
