use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use herald_notifications::{
    Channel, ChannelKind, DatabaseChannel, DatabaseNotification, DeliveryStore, DispatchReport,
    HasDatabaseNotifications, InMemoryDeliveryStore, MailChannel, MailMessage, MailNotification,
    MemoryMailTransport, Notifiable, NotifiableRef, NotifiableResolver, Notification,
    NotificationError, NotificationSender, RoutesNotifications,
};

struct User {
    id: u32,
    email: String,
    muted: Vec<ChannelKind>,
}

impl User {
    fn new(id: u32) -> Self {
        Self {
            id,
            email: format!("user{id}@example.com"),
            muted: Vec::new(),
        }
    }

    fn muting(mut self, channel: ChannelKind) -> Self {
        self.muted.push(channel);
        self
    }
}

impl Notifiable for User {
    fn notifiable_ref(&self) -> NotifiableRef {
        NotifiableRef::new("User", self.id.to_string())
    }

    fn should_send_notification(&self, _notification: &dyn Notification, channel: &ChannelKind) -> bool {
        !self.muted.contains(channel)
    }

    fn route_notification_for(&self, channel: &ChannelKind) -> Option<String> {
        (*channel == ChannelKind::MAIL).then(|| self.email.clone())
    }
}

/// Notification whose channel list is decided per recipient
struct InvoicePaid {
    amount: u64,
    channels: Vec<ChannelKind>,
    skip_user: Option<u32>,
}

impl InvoicePaid {
    fn on(channels: &[ChannelKind]) -> Self {
        Self {
            amount: 42,
            channels: channels.to_vec(),
            skip_user: None,
        }
    }
}

impl Notification for InvoicePaid {
    fn via(&self, notifiable: &dyn Notifiable) -> Vec<ChannelKind> {
        let id = notifiable.notifiable_ref().id;
        if self.skip_user.map(|u| u.to_string()) == Some(id) {
            return Vec::new();
        }
        self.channels.clone()
    }

    fn as_database(&self) -> Option<&dyn DatabaseNotification> {
        Some(self)
    }

    fn as_mail(&self) -> Option<&dyn MailNotification> {
        Some(self)
    }
}

impl DatabaseNotification for InvoicePaid {
    fn to_database(&self, _notifiable: &dyn Notifiable) -> Value {
        json!({ "amount": self.amount })
    }
}

impl MailNotification for InvoicePaid {
    fn to_mail(&self, notifiable: &dyn Notifiable) -> MailMessage {
        MailMessage::new()
            .to(notifiable
                .route_notification_for(&ChannelKind::MAIL)
                .unwrap_or_default())
            .subject("Invoice paid")
            .text(format!("We received {}", self.amount))
    }
}

/// Declares database in via() but has no database renderer
struct Broken;

impl Notification for Broken {
    fn via(&self, _notifiable: &dyn Notifiable) -> Vec<ChannelKind> {
        vec![ChannelKind::DATABASE]
    }
}

/// Counts invocations instead of delivering
struct CountingChannel {
    kind: ChannelKind,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Channel for CountingChannel {
    fn kind(&self) -> ChannelKind {
        self.kind.clone()
    }

    async fn send(
        &self,
        _notifiable: &dyn Notifiable,
        _notification: &dyn Notification,
    ) -> Result<(), NotificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Fixture {
    store: Arc<InMemoryDeliveryStore>,
    mail: Arc<MemoryMailTransport>,
    sms_calls: Arc<AtomicU32>,
    sender: NotificationSender,
}

fn sms() -> ChannelKind {
    ChannelKind::custom("sms")
}

fn fixture() -> Fixture {
    let store = Arc::new(InMemoryDeliveryStore::new());
    let mail = Arc::new(MemoryMailTransport::new());
    let sms_calls = Arc::new(AtomicU32::new(0));

    let sender = NotificationSender::new()
        .with_channel(DatabaseChannel::new(store.clone()))
        .with_channel(
            MailChannel::new(mail.clone())
                .with_default_from("noreply@example.com")
                .unwrap(),
        )
        .with_channel(CountingChannel {
            kind: sms(),
            calls: sms_calls.clone(),
        });

    Fixture {
        store,
        mail,
        sms_calls,
        sender,
    }
}

#[tokio::test]
async fn empty_via_sends_nothing() {
    let fx = fixture();
    let user = User::new(1);

    let report = fx
        .sender
        .send(&[&user], &InvoicePaid::on(&[]), None)
        .await
        .unwrap();

    assert_eq!(
        report,
        DispatchReport {
            delivered: 0,
            vetoed: 0,
            skipped_recipients: 1
        }
    );
    assert!(fx.store.is_empty().await);
    assert!(fx.mail.messages().await.is_empty());
    assert_eq!(fx.sms_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn vetoed_channel_is_never_invoked() {
    let fx = fixture();
    let user = User::new(1).muting(ChannelKind::MAIL).muting(sms());
    let notification = InvoicePaid::on(&[ChannelKind::MAIL, ChannelKind::DATABASE, sms()]);

    let report = fx.sender.send(&[&user], &notification, None).await.unwrap();

    assert_eq!(report.delivered, 1);
    assert_eq!(report.vetoed, 2);
    assert_eq!(report.skipped_recipients, 0);
    assert!(fx.mail.messages().await.is_empty());
    assert_eq!(fx.sms_calls.load(Ordering::SeqCst), 0);
    assert_eq!(user.notifications(fx.store.as_ref()).count().await.unwrap(), 1);
}

#[tokio::test]
async fn vetoed_all_is_distinguishable_from_no_channels() {
    let fx = fixture();
    let user = User::new(1).muting(ChannelKind::DATABASE);

    let report = fx
        .sender
        .send(&[&user], &InvoicePaid::on(&[ChannelKind::DATABASE]), None)
        .await
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(report.vetoed, 1);
    assert_eq!(report.skipped_recipients, 0);
}

#[tokio::test]
async fn database_delivery_is_readable_by_recipient() {
    let fx = fixture();
    let user = User::new(7);

    user.notify(&fx.sender, &InvoicePaid::on(&[ChannelKind::DATABASE]))
        .await
        .unwrap();

    let records = user.notifications(fx.store.as_ref()).fetch().await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.data, json!({ "amount": 42 }));
    assert!(record.read_at.is_none());
    assert_eq!(record.notifiable, user.notifiable_ref());
    assert_eq!(record.notification_type, std::any::type_name::<InvoicePaid>());
    assert!(record.notification_type.ends_with("::InvoicePaid"));
}

#[tokio::test]
async fn mark_as_read_round_trip() {
    let fx = fixture();
    let user = User::new(7);
    user.notify(&fx.sender, &InvoicePaid::on(&[ChannelKind::DATABASE]))
        .await
        .unwrap();

    let id = user.notifications(fx.store.as_ref()).fetch().await.unwrap()[0].id;

    let read = fx.store.mark_as_read(id).await.unwrap();
    let read_at = read.read_at.expect("read_at set");
    let again = fx.store.mark_as_read(id).await.unwrap();
    assert_eq!(again.read_at, Some(read_at));
    assert_eq!(user.unread_notifications(fx.store.as_ref()).count().await.unwrap(), 0);

    let unread = fx.store.mark_as_unread(id).await.unwrap();
    assert!(unread.read_at.is_none());
    let again = fx.store.mark_as_unread(id).await.unwrap();
    assert!(again.read_at.is_none());
    assert_eq!(user.read_notifications(fx.store.as_ref()).count().await.unwrap(), 0);
}

#[tokio::test]
async fn missing_render_method_fails_without_partial_record() {
    let fx = fixture();
    let user = User::new(1);

    let result = fx.sender.send(&[&user], &Broken, None).await;

    match result {
        Err(NotificationError::MissingRenderMethod {
            channel,
            notification_type,
        }) => {
            assert_eq!(channel, ChannelKind::DATABASE);
            assert!(notification_type.ends_with("::Broken"));
        }
        other => panic!("expected MissingRenderMethod, got {other:?}"),
    }
    assert!(fx.store.is_empty().await);
}

#[tokio::test]
async fn first_failure_aborts_remaining_recipients() {
    let fx = fixture();
    let first = User::new(1);
    let second = User::new(2);

    let result = fx
        .sender
        .send(&[&first, &second], &Broken, Some(&[sms(), ChannelKind::DATABASE]))
        .await;

    assert!(result.is_err());
    // first recipient reached sms before failing on database; second never started
    assert_eq!(fx.sms_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn send_isolated_keeps_going_after_failure() {
    let fx = fixture();
    let muted = User::new(1).muting(ChannelKind::DATABASE);
    let open = User::new(2);
    let notifiables: [&dyn Notifiable; 2] = [&open, &muted];

    let outcomes = fx
        .sender
        .send_isolated(&notifiables, &Broken, Some(&[ChannelKind::DATABASE, sms()]))
        .await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].notifiable, open.notifiable_ref());
    assert!(matches!(
        outcomes[0].result,
        Err(NotificationError::MissingRenderMethod { .. })
    ));
    let report = outcomes[1].result.as_ref().unwrap();
    assert_eq!(report.vetoed, 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(fx.sms_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn explicit_channels_override_via_for_every_recipient() {
    let fx = fixture();
    let alice = User::new(1);
    let bob = User::new(2);
    let notification = InvoicePaid {
        skip_user: Some(2),
        ..InvoicePaid::on(&[ChannelKind::DATABASE])
    };

    let report = fx
        .sender
        .send_now(&[&alice, &bob], &notification, Some(&[ChannelKind::MAIL]))
        .await
        .unwrap();

    assert_eq!(report.delivered, 2);
    assert_eq!(report.skipped_recipients, 0);
    assert!(fx.store.is_empty().await);

    let messages = fx.mail.messages().await;
    let recipients: Vec<String> = messages
        .iter()
        .map(|m| m.envelope().to()[0].to_string())
        .collect();
    assert_eq!(recipients, vec!["user1@example.com", "user2@example.com"]);
}

#[tokio::test]
async fn empty_override_falls_back_to_via() {
    let fx = fixture();
    let user = User::new(1);

    user.notify_now(
        &fx.sender,
        &InvoicePaid::on(&[ChannelKind::DATABASE]),
        Some(&[]),
    )
    .await
    .unwrap();

    assert_eq!(fx.store.len().await, 1);
}

#[tokio::test]
async fn via_varies_per_recipient() {
    let fx = fixture();
    let alice = User::new(1);
    let bob = User::new(2);
    let notification = InvoicePaid {
        skip_user: Some(2),
        ..InvoicePaid::on(&[ChannelKind::DATABASE, ChannelKind::MAIL])
    };

    let report = fx
        .sender
        .send(&[&alice, &bob], &notification, None)
        .await
        .unwrap();

    assert_eq!(report.delivered, 2);
    assert_eq!(report.skipped_recipients, 1);
    assert_eq!(alice.notifications(fx.store.as_ref()).count().await.unwrap(), 1);
    assert_eq!(bob.notifications(fx.store.as_ref()).count().await.unwrap(), 0);
}

#[tokio::test]
async fn unregistered_channel_is_an_error() {
    let fx = fixture();
    let user = User::new(1);

    let result = fx
        .sender
        .send(&[&user], &InvoicePaid::on(&[ChannelKind::PUSH]), None)
        .await;

    assert!(matches!(
        result,
        Err(NotificationError::ChannelNotRegistered(ref kind)) if *kind == ChannelKind::PUSH
    ));
}

struct Directory;

#[async_trait]
impl NotifiableResolver for Directory {
    async fn resolve(
        &self,
        notifiable: &NotifiableRef,
    ) -> Result<Option<Arc<dyn Notifiable>>, NotificationError> {
        if notifiable.kind != "User" {
            return Ok(None);
        }
        let id = notifiable
            .id
            .parse()
            .map_err(|e| NotificationError::Internal(format!("bad user id: {e}")))?;
        Ok(Some(Arc::new(User::new(id))))
    }
}

#[tokio::test]
async fn record_back_reference_resolves_on_demand() {
    let fx = fixture();
    let user = User::new(9);
    user.notify(&fx.sender, &InvoicePaid::on(&[ChannelKind::DATABASE]))
        .await
        .unwrap();

    let record = user.notifications(fx.store.as_ref()).fetch().await.unwrap().remove(0);
    let resolved = record.resolve_notifiable(&Directory).await.unwrap().unwrap();
    assert_eq!(resolved.notifiable_ref(), user.notifiable_ref());
}

#[test]
fn sender_lists_registered_channels() {
    let fx = fixture();
    assert_eq!(
        fx.sender.channel_kinds(),
        vec![ChannelKind::DATABASE, ChannelKind::MAIL, sms()]
    );
    assert!(fx.sender.channel(&ChannelKind::PUSH).is_none());
}
