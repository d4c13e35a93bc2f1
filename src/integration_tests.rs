#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::app_system::ShopSystem;
    use crate::catalog::CatalogStore;
    use crate::config::{AdminList, AppConfig, SessionBackend};
    use crate::controller::Controller;
    use crate::domain::{
        Action, ButtonKey, ButtonTarget, InboundEvent, Operation, OrderStatus, ProductDraft,
        ProductSnapshot, Session,
    };
    use crate::flows::FlowContext;
    use crate::mock_framework::{FaultyStore, PanicOnceTransport, RecordingTransport};
    use crate::notify::Transport;
    use crate::session_store::{KvSessionStore, MemorySessionStore, SessionStore};
    use crate::store::{KvStore, MemoryStore};

    const ADMIN: &str = "admin-1";
    const OTHER_ADMIN: &str = "admin-2";
    const BUYER: &str = "buyer-1";

    const SCENARIO_A: &str = "id: PRD001\nnama: Kaos Polos\nharga: 50000\nstock: 10";

    struct Harness {
        controller: Controller,
        transport: Arc<RecordingTransport>,
        store: Arc<FaultyStore>,
        sessions: Arc<MemorySessionStore>,
    }

    fn harness_with(transport: Arc<dyn Transport>, recording: Arc<RecordingTransport>) -> Harness {
        let (actor, client) = MemoryStore::new(32);
        tokio::spawn(actor.run());
        let store = Arc::new(FaultyStore::new(Arc::new(client)));
        let sessions = Arc::new(MemorySessionStore::new());

        let ctx = FlowContext::new(store.clone(), transport, AdminList::new([ADMIN, OTHER_ADMIN]));
        Harness {
            controller: Controller::new(sessions.clone(), ctx),
            transport: recording,
            store,
            sessions,
        }
    }

    fn harness() -> Harness {
        let recording = Arc::new(RecordingTransport::default());
        harness_with(recording.clone(), recording)
    }

    impl Harness {
        async fn text(&self, sender: &str, text: &str) -> Operation {
            self.controller
                .handle(InboundEvent::text(sender, sender, text))
                .await
                .unwrap()
        }

        async fn act(&self, sender: &str, action: Action) -> Operation {
            self.controller
                .handle(InboundEvent::action(sender, sender, action))
                .await
                .unwrap()
        }

        fn ctx(&self) -> &FlowContext {
            self.controller.context()
        }

        fn last(&self, conversation: &str) -> String {
            self.transport.last_text(conversation).unwrap_or_default()
        }

        async fn seed_kaos(&self) {
            self.ctx()
                .catalog
                .create_product("PRD001", ProductDraft::new("Kaos Polos", 50000, 10))
                .await
                .unwrap();
        }

        async fn place_order(&self, buyer: &str) {
            assert!(matches!(
                self.act(buyer, Action::BuyProduct("PRD001".into())).await,
                Operation::OrderingName { .. }
            ));
            self.text(buyer, "Budi").await;
            self.text(buyer, "Jl. Mawar 1").await;
            assert_eq!(self.text(buyer, "08123456789").await, Operation::Idle);
        }

        async fn only_order_id(&self) -> String {
            let orders = self.ctx().orders.list_orders().await.unwrap();
            assert_eq!(orders.len(), 1);
            orders[0].id.clone()
        }
    }

    // --- Catalog ---

    #[tokio::test]
    async fn scenario_a_admin_adds_product_from_block() {
        let h = harness();
        assert_eq!(h.act(ADMIN, Action::AdminAddProduct).await, Operation::CatalogAdd);
        assert_eq!(h.text(ADMIN, SCENARIO_A).await, Operation::Idle);

        let product = h.ctx().catalog.get_product("PRD001").await.unwrap().unwrap();
        assert_eq!(product.name, "Kaos Polos");
        assert_eq!(product.price, 50000);
        assert_eq!(product.stock, 10);
        assert!(product.links.is_empty());
        assert!(h.last(ADMIN).contains("PRD001"));
    }

    #[tokio::test]
    async fn malformed_block_reprompts_without_leaving_the_step() {
        let h = harness();
        h.act(ADMIN, Action::AdminAddProduct).await;
        let op = h.text(ADMIN, "id: PRD001\nnama: Kaos\nharga: 50.000\nstock: 10").await;
        assert_eq!(op, Operation::CatalogAdd);
        assert!(h.last(ADMIN).starts_with("⚠️"));
        assert_eq!(h.ctx().catalog.get_product("PRD001").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_id_aborts_and_keeps_the_original() {
        let h = harness();
        h.seed_kaos().await;
        h.act(ADMIN, Action::AdminAddProduct).await;
        let op = h
            .text(ADMIN, "id: PRD001\nname: Impostor\nprice: 1\nstock: 1")
            .await;
        assert_eq!(op, Operation::Idle);
        assert!(h.last(ADMIN).contains("already exists"));

        let product = h.ctx().catalog.get_product("PRD001").await.unwrap().unwrap();
        assert_eq!(product.name, "Kaos Polos");
        assert_eq!(product.price, 50000);
    }

    #[tokio::test]
    async fn partial_edit_overwrites_only_present_keys() {
        let h = harness();
        h.seed_kaos().await;
        assert_eq!(h.act(ADMIN, Action::AdminEditProduct).await, Operation::CatalogEditSelect);
        assert_eq!(
            h.text(ADMIN, "PRD001").await,
            Operation::CatalogEditApply { product_id: "PRD001".into() }
        );
        assert_eq!(h.text(ADMIN, "harga: 45000").await, Operation::Idle);

        let product = h.ctx().catalog.get_product("PRD001").await.unwrap().unwrap();
        assert_eq!(product.price, 45000);
        assert_eq!(product.name, "Kaos Polos");
        assert_eq!(product.stock, 10);
    }

    #[tokio::test]
    async fn editing_or_deleting_a_missing_product_is_not_found() {
        let h = harness();
        h.seed_kaos().await;

        assert_eq!(h.act(ADMIN, Action::AdminSelectEdit("NOPE".into())).await, Operation::Idle);
        assert_eq!(h.last(ADMIN), "❌ Product not found.");

        h.act(ADMIN, Action::AdminDeleteProduct).await;
        assert_eq!(h.text(ADMIN, "NOPE").await, Operation::Idle);
        assert_eq!(h.last(ADMIN), "❌ Product not found.");
        assert_eq!(h.ctx().catalog.list_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_can_be_cancelled_or_confirmed() {
        let h = harness();
        h.seed_kaos().await;

        let op = h.act(ADMIN, Action::AdminSelectDelete("PRD001".into())).await;
        assert_eq!(op, Operation::CatalogDeleteConfirm { product_id: "PRD001".into() });
        assert_eq!(h.text(ADMIN, "batal").await, Operation::Idle);
        assert!(h.ctx().catalog.get_product("PRD001").await.unwrap().is_some());

        h.act(ADMIN, Action::AdminSelectDelete("PRD001".into())).await;
        assert_eq!(h.text(ADMIN, "maybe").await, Operation::CatalogDeleteConfirm { product_id: "PRD001".into() });
        assert_eq!(h.act(ADMIN, Action::AdminConfirmDelete).await, Operation::Idle);
        assert_eq!(h.ctx().catalog.get_product("PRD001").await.unwrap(), None);
    }

    #[tokio::test]
    async fn stray_delete_confirmation_changes_nothing() {
        let h = harness();
        h.seed_kaos().await;
        assert_eq!(h.act(ADMIN, Action::AdminConfirmDelete).await, Operation::Idle);
        assert!(h.ctx().catalog.get_product("PRD001").await.unwrap().is_some());
    }

    // --- Ordering ---

    #[tokio::test]
    async fn scenario_b_buyer_places_an_order() {
        let h = harness();
        h.seed_kaos().await;

        assert!(matches!(
            h.act(BUYER, Action::BuyProduct("PRD001".into())).await,
            Operation::OrderingName { .. }
        ));
        assert!(matches!(h.text(BUYER, "Budi").await, Operation::OrderingAddress { .. }));
        assert!(matches!(h.text(BUYER, "Jl. Mawar 1").await, Operation::OrderingPhone { .. }));
        assert_eq!(h.text(BUYER, "08123456789").await, Operation::Idle);

        let orders = h.ctx().orders.list_orders().await.unwrap();
        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert_eq!(order.status, OrderStatus::WaitingPayment);
        assert_eq!(order.shipping.name, "Budi");
        assert_eq!(order.shipping.phone, "08123456789");
        assert_eq!(order.product.price, 50000);
        assert_eq!(order.buyer_id, BUYER);

        let summary = h.last(BUYER);
        assert!(summary.contains(&order.id));
        assert!(summary.contains("Payment instructions"));

        let counts = h.transport.counts();
        assert_eq!(counts.get(ADMIN), Some(&1));
        assert_eq!(counts.get(OTHER_ADMIN), Some(&1));
        assert_eq!(h.sessions.get(BUYER).await.unwrap(), None);
    }

    #[tokio::test]
    async fn order_keeps_price_from_when_ordering_started() {
        let h = harness();
        h.seed_kaos().await;
        h.act(BUYER, Action::BuyProduct("PRD001".into())).await;

        h.act(ADMIN, Action::AdminSelectEdit("PRD001".into())).await;
        h.text(ADMIN, "price: 99000\nname: Kaos Premium").await;

        h.text(BUYER, "Budi").await;
        h.text(BUYER, "Jl. Mawar 1").await;
        h.text(BUYER, "08123456789").await;

        let orders = h.ctx().orders.list_orders().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].product.price, 50000);
        assert_eq!(orders[0].product.name, "Kaos Polos");
    }

    #[tokio::test]
    async fn blank_address_does_not_advance() {
        let h = harness();
        h.seed_kaos().await;
        h.act(BUYER, Action::BuyProduct("PRD001".into())).await;
        h.text(BUYER, "Budi").await;

        let op = h.text(BUYER, "   ").await;
        assert!(matches!(op, Operation::OrderingAddress { .. }));
        assert!(h.ctx().orders.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_or_sold_out_product_cannot_be_ordered() {
        let h = harness();
        assert_eq!(h.act(BUYER, Action::BuyProduct("NOPE".into())).await, Operation::Idle);
        assert_eq!(h.last(BUYER), "❌ Product not found.");

        h.ctx()
            .catalog
            .create_product("EMPTY", ProductDraft::new("Sold Out Mug", 1000, 0))
            .await
            .unwrap();
        assert_eq!(h.act(BUYER, Action::BuyProduct("EMPTY".into())).await, Operation::Idle);
        assert!(h.last(BUYER).contains("out of stock"));
    }

    #[tokio::test]
    async fn cancel_command_clears_ordering() {
        let h = harness();
        h.seed_kaos().await;
        h.act(BUYER, Action::BuyProduct("PRD001".into())).await;
        h.text(BUYER, "Budi").await;

        assert_eq!(h.text(BUYER, "/cancel").await, Operation::Idle);
        assert_eq!(h.text(BUYER, "Jl. Mawar 1").await, Operation::Idle);
        assert!(h.ctx().orders.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn views_keep_the_active_step_but_new_flows_replace_it() {
        let h = harness();
        h.seed_kaos().await;
        h.act(BUYER, Action::BuyProduct("PRD001".into())).await;
        h.text(BUYER, "Budi").await;

        let op = h.act(BUYER, Action::ViewCatalog).await;
        assert!(matches!(op, Operation::OrderingAddress { .. }));

        let op = h.act(BUYER, Action::BuyProduct("PRD001".into())).await;
        assert!(matches!(op, Operation::OrderingName { .. }));
    }

    #[tokio::test]
    async fn storage_failure_at_phone_step_keeps_the_step() {
        let h = harness();
        h.seed_kaos().await;
        h.act(BUYER, Action::BuyProduct("PRD001".into())).await;
        h.text(BUYER, "Budi").await;
        h.text(BUYER, "Jl. Mawar 1").await;

        h.store.set_fail_writes(true);
        let op = h.text(BUYER, "08123456789").await;
        assert!(matches!(op, Operation::OrderingPhone { .. }));
        assert!(h.last(BUYER).contains("Something went wrong"));
        h.store.set_fail_writes(false);
        assert!(h.ctx().orders.list_orders().await.unwrap().is_empty());

        assert_eq!(h.text(BUYER, "08123456789").await, Operation::Idle);
        assert_eq!(h.ctx().orders.list_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn payment_setting_shows_up_in_the_next_summary() {
        let h = harness();
        h.seed_kaos().await;
        assert_eq!(h.act(ADMIN, Action::AdminSetPayment).await, Operation::SettingsPayment);
        assert_eq!(h.text(ADMIN, "Transfer ke BNI 42").await, Operation::Idle);

        h.place_order(BUYER).await;
        assert!(h.last(BUYER).contains("Transfer ke BNI 42"));
    }

    // --- Order admin ---

    #[tokio::test]
    async fn confirming_payment_twice_notifies_buyer_once() {
        let h = harness();
        h.seed_kaos().await;
        h.place_order(BUYER).await;
        let order_id = h.only_order_id().await;
        let before = h.transport.sent_to(BUYER).len();

        for _ in 0..2 {
            assert_eq!(h.act(ADMIN, Action::AdminConfirmPayment).await, Operation::OrderConfirmPayment);
            assert_eq!(h.text(ADMIN, &order_id).await, Operation::Idle);
        }

        assert_eq!(h.transport.sent_to(BUYER).len(), before + 1);
        assert!(h.last(ADMIN).contains("already"));
        let order = h.ctx().orders.get_order(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found_and_step_is_cleared() {
        let h = harness();
        h.act(ADMIN, Action::AdminConfirmPayment).await;
        assert_eq!(h.text(ADMIN, "ORD-404").await, Operation::Idle);
        assert_eq!(h.last(ADMIN), "❌ Order not found.");
    }

    #[tokio::test]
    async fn tracking_number_ships_and_notifies_once() {
        let h = harness();
        h.seed_kaos().await;
        h.place_order(BUYER).await;
        let order_id = h.only_order_id().await;

        h.act(ADMIN, Action::AdminSetTracking).await;
        assert_eq!(h.text(ADMIN, "no separator").await, Operation::OrderSetTracking);
        assert_eq!(h.text(ADMIN, &format!("{order_id}|JNE123")).await, Operation::Idle);
        assert!(h.last(BUYER).contains("JNE123"));
        let notices = h.transport.sent_to(BUYER).len();

        h.act(ADMIN, Action::AdminSetTracking).await;
        h.text(ADMIN, &format!("{order_id}|JNE123")).await;
        assert_eq!(h.transport.sent_to(BUYER).len(), notices);

        let order = h.ctx().orders.get_order(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.tracking_number.as_deref(), Some("JNE123"));
    }

    #[tokio::test]
    async fn free_text_status_is_stored_without_buyer_notice() {
        let h = harness();
        h.seed_kaos().await;
        h.place_order(BUYER).await;
        let order_id = h.only_order_id().await;
        let before = h.transport.sent_to(BUYER).len();

        h.act(ADMIN, Action::AdminSetStatus).await;
        h.text(ADMIN, &format!("{order_id}|Dikemas gudang")).await;

        let order = h.ctx().orders.get_order(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Other("Dikemas gudang".into()));
        assert_eq!(h.transport.sent_to(BUYER).len(), before);

        h.act(BUYER, Action::TrackOrders).await;
        assert!(h.last(BUYER).contains("Dikemas gudang"));
    }

    // --- Access and texts ---

    #[tokio::test]
    async fn buyers_cannot_reach_admin_operations() {
        let h = harness();
        assert_eq!(h.act(BUYER, Action::AdminAddProduct).await, Operation::Idle);
        assert_eq!(h.last(BUYER), "❌ You are not an admin!");

        // A stale admin session does not let a non-admin through either.
        h.sessions
            .set(Session::new(BUYER, Operation::SettingsGreeting))
            .await
            .unwrap();
        assert_eq!(h.text(BUYER, "Hacked").await, Operation::Idle);
        assert_eq!(
            h.ctx().settings.setting(crate::domain::SettingKey::Greeting).await.unwrap(),
            crate::domain::SettingKey::Greeting.default_value()
        );
    }

    #[tokio::test]
    async fn renamed_button_appears_on_product_detail() {
        let h = harness();
        h.seed_kaos().await;
        let op = h.act(ADMIN, Action::AdminEditButton(ButtonKey::Buy)).await;
        assert_eq!(op, Operation::ButtonLabelEdit { key: ButtonKey::Buy });
        assert_eq!(h.text(ADMIN, "🛒 Beli Sekarang").await, Operation::Idle);

        h.act(BUYER, Action::ViewProduct("PRD001".into())).await;
        let detail = h.transport.sent_to(BUYER).pop().unwrap();
        assert!(detail.buttons.iter().any(|b| {
            b.label == "🛒 Beli Sekarang" && b.target == ButtonTarget::Action(Action::BuyProduct("PRD001".into()))
        }));
    }

    #[tokio::test]
    async fn start_menu_shows_admin_panel_only_to_admins() {
        let h = harness();
        h.text(BUYER, "/start").await;
        let menu = h.transport.sent_to(BUYER).pop().unwrap();
        assert!(!menu.buttons.iter().any(|b| b.target == ButtonTarget::Action(Action::AdminPanel)));

        h.text(ADMIN, "/start").await;
        let menu = h.transport.sent_to(ADMIN).pop().unwrap();
        assert!(menu.buttons.iter().any(|b| b.target == ButtonTarget::Action(Action::AdminPanel)));
    }

    // --- Failure containment ---

    #[tokio::test]
    async fn panic_in_a_flow_resets_the_conversation() {
        let recording = Arc::new(RecordingTransport::default());
        let h = harness_with(Arc::new(PanicOnceTransport::new(recording.clone())), recording);
        let product = ProductSnapshot {
            id: "PRD001".into(),
            name: "Kaos Polos".into(),
            price: 50000,
        };
        h.sessions
            .set(Session::new(BUYER, Operation::OrderingName { product }))
            .await
            .unwrap();

        assert_eq!(h.text(BUYER, "Budi").await, Operation::Idle);
        assert!(h.last(BUYER).contains("Something went wrong"));
        assert_eq!(h.sessions.get(BUYER).await.unwrap(), None);
    }

    #[tokio::test]
    async fn conversations_run_in_parallel_through_the_system() {
        let transport = Arc::new(RecordingTransport::default());
        let config = AppConfig {
            admin_ids: AdminList::new([ADMIN]),
            ..AppConfig::default()
        };
        let system = ShopSystem::new(config, transport.clone());
        let client = system.client.clone();

        client
            .dispatch(InboundEvent::action(ADMIN, ADMIN, Action::AdminAddProduct))
            .await
            .unwrap();
        client
            .dispatch(InboundEvent::text(ADMIN, ADMIN, SCENARIO_A))
            .await
            .unwrap();

        let mut buyers = Vec::new();
        for i in 0..5 {
            let client = client.clone();
            buyers.push(tokio::spawn(async move {
                let buyer = format!("buyer-{i}");
                client
                    .dispatch(InboundEvent::action(&buyer, &buyer, Action::BuyProduct("PRD001".into())))
                    .await
                    .unwrap();
                for line in ["Budi", "Jl. Mawar 1", "08123456789"] {
                    client.dispatch(InboundEvent::text(&buyer, &buyer, line)).await.unwrap();
                }
            }));
        }
        for buyer in buyers {
            buyer.await.unwrap();
        }

        let orders = system.store.set_members("orders").await.unwrap();
        assert_eq!(orders.len(), 5);
        for i in 0..5 {
            let summary = transport.last_text(&format!("buyer-{i}")).unwrap();
            assert!(summary.contains("Order created"));
        }
        assert_eq!(transport.counts().get(ADMIN), Some(&(2 + 5)));

        system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn redelivered_events_of_one_conversation_run_one_at_a_time() {
        let transport = Arc::new(RecordingTransport::default());
        let config = AppConfig {
            admin_ids: AdminList::new([ADMIN]),
            session_backend: SessionBackend::Store,
            ..AppConfig::default()
        };
        let system = ShopSystem::new(config, transport.clone());
        let client = system.client.clone();
        CatalogStore::new(Arc::new(system.store.clone()))
            .create_product("PRD001", ProductDraft::new("Kaos Polos", 50000, 10))
            .await
            .unwrap();

        client
            .dispatch(InboundEvent::action(BUYER, BUYER, Action::BuyProduct("PRD001".into())))
            .await
            .unwrap();
        for line in ["Budi", "Jl. Mawar 1"] {
            client.dispatch(InboundEvent::text(BUYER, BUYER, line)).await.unwrap();
        }

        let deliveries = (0..10).map(|_| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .dispatch(InboundEvent::text(BUYER, BUYER, "08123456789"))
                    .await
                    .unwrap()
            })
        });
        for op in futures::future::join_all(deliveries).await {
            assert_eq!(op.unwrap(), Operation::Idle);
        }

        assert_eq!(system.store.set_members("orders").await.unwrap().len(), 1);
        let summaries = transport
            .sent_to(BUYER)
            .into_iter()
            .filter(|m| m.text.contains("Order created"))
            .count();
        assert_eq!(summaries, 1);
        let sessions = KvSessionStore::new(Arc::new(system.store.clone()));
        assert_eq!(sessions.get(BUYER).await.unwrap(), None);

        system.shutdown().await.unwrap();
    }
}
