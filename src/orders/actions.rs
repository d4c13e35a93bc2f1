use crate::domain::OrderStatus;

// Custom actions for Order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderAction {
    ConfirmPayment,
    SetTracking(String),
    SetStatus(OrderStatus),
}
