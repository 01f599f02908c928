//! ---
//! pmig_section: "15-testing-qa-runbook"
//! pmig_subsection: "integration-tests"
//! pmig_type: "source"
//! pmig_scope: "code"
//! pmig_description: "Fleet health aggregation under partial outages."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
use std::time::{Duration, Instant};

use pmig_orchestrator::HostStatus;
use pmig_testharness::LocalFleet;

const CALL_TIMEOUT: Duration = Duration::from_millis(300);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn partial_outage_reports_every_host() {
    let fleet = LocalFleet::standard();
    fleet.manager("server-a").start("a-1", "compute").unwrap();
    fleet.manager("server-a").start("a-2", "compute").unwrap();
    fleet.manager("server-c").start("c-1", "batch").unwrap();
    fleet.set_reachable("server-b", false);
    fleet.set_reachable("server-d", false);

    let health = fleet.aggregator(CALL_TIMEOUT).fleet_health().await;

    assert_eq!(health.hosts.len(), 5);
    assert_eq!(health.online_count(), 3);
    assert_eq!(health.total_running(), 3);
    for name in ["server-b", "server-d"] {
        let host = health.get(name).unwrap();
        assert_eq!(host.status, HostStatus::Offline);
        assert!(host.error.is_some());
        assert!(host.running_count.is_none());
    }
    for (name, running) in [("server-a", 2), ("server-c", 1), ("server-e", 0)] {
        let host = health.get(name).unwrap();
        assert_eq!(host.status, HostStatus::Healthy);
        assert_eq!(host.running_count, Some(running));
        assert!(host.error.is_none());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_hosts_time_out_concurrently() {
    let fleet = LocalFleet::standard();
    for name in ["server-b", "server-c", "server-d"] {
        fleet.set_latency(name, Duration::from_secs(5));
    }

    let started = Instant::now();
    let health = fleet.aggregator(CALL_TIMEOUT).fleet_health().await;
    let elapsed = started.elapsed();

    assert_eq!(health.online_count(), 2);
    let slow = health.get("server-c").unwrap();
    assert_eq!(slow.status, HostStatus::Offline);
    assert!(slow.error.as_deref().unwrap().contains("timed out"));
    // Probes run in parallel, so three timeouts cost about one.
    assert!(elapsed < CALL_TIMEOUT * 3, "fan-out took {elapsed:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn paused_processes_are_not_counted() {
    let fleet = LocalFleet::standard();
    let manager = fleet.manager("server-e");
    manager.start("e-1", "compute").unwrap();
    manager.start("e-2", "compute").unwrap();
    manager.pause("e-1").unwrap();

    let health = fleet.aggregator(CALL_TIMEOUT).fleet_health().await;
    assert_eq!(health.get("server-e").unwrap().running_count, Some(1));
    assert_eq!(
        health.get("server-e").unwrap().reported_name.as_deref(),
        Some("server-e")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn registry_replacement_changes_the_fan_out() {
    let fleet = LocalFleet::standard();
    let registry = fleet.registry();
    let aggregator = pmig_orchestrator::FleetHealthAggregator::new(registry.clone(), fleet.clone())
        .with_call_timeout(CALL_TIMEOUT);
    assert_eq!(aggregator.fleet_health().await.hosts.len(), 5);

    let kept: Vec<_> = registry
        .endpoints()
        .into_iter()
        .filter(|host| host.name != "server-e")
        .map(|host| (host.name, host.address))
        .collect();
    registry.replace(kept);

    let health = aggregator.fleet_health().await;
    assert_eq!(health.hosts.len(), 4);
    assert!(health.get("server-e").is_none());
    assert_eq!(fleet.calls("server-e"), 1);
}
