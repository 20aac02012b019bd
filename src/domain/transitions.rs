use crate::domain::payment::PaymentStatus;

pub fn allowed_targets(from: PaymentStatus) -> &'static [PaymentStatus] {
    match from {
        PaymentStatus::Pending => &[
            PaymentStatus::Completed,
            PaymentStatus::Failed,
            PaymentStatus::Expired,
        ],
        PaymentStatus::Failed => &[PaymentStatus::Pending, PaymentStatus::Expired],
        PaymentStatus::Expired => &[PaymentStatus::Pending],
        PaymentStatus::Completed => &[],
    }
}

pub fn can_transition(from: PaymentStatus, to: PaymentStatus) -> bool {
    allowed_targets(from).contains(&to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use PaymentStatus::*;

    #[test]
    fn table_matches_lifecycle() {
        let allowed = [
            (Pending, Completed),
            (Pending, Failed),
            (Pending, Expired),
            (Failed, Pending),
            (Failed, Expired),
            (Expired, Pending),
        ];
        for from in PaymentStatus::ALL {
            for to in PaymentStatus::ALL {
                assert_eq!(
                    can_transition(from, to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn completed_is_terminal() {
        assert!(allowed_targets(Completed).is_empty());
    }
}
