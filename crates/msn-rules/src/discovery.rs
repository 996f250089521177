use crate::DiscoveryStatus;

impl DiscoveryStatus {
    /// Raises the status to `status`, leaving it untouched if it's already at least that high
    pub fn elevate(&mut self, status: Self) {
        *self = (*self).max(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_never_regresses() {
        let mut status = DiscoveryStatus::default();
        assert_eq!(status, DiscoveryStatus::NoMsnPresent);
        status.elevate(DiscoveryStatus::FragmentsDetected);
        status.elevate(DiscoveryStatus::HeadGroupDetected);
        assert_eq!(status, DiscoveryStatus::FragmentsDetected);
        status.elevate(DiscoveryStatus::PositionDetected);
        assert_eq!(status, DiscoveryStatus::PositionDetected);
        status.elevate(DiscoveryStatus::NoMsnPresent);
        assert_eq!(status.to_string(), "chain positions detected");
    }
}
