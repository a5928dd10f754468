//! Demonstration of the gesture engine on a scripted session.
//!
//! This example shows how to:
//! 1. Create host-driven signal sources
//! 2. Start the engine in step with a background service
//! 3. Feed screen toggles and accelerometer samples
//! 4. Receive emergency deliveries on a channel
//! 5. Stop and restart with fresh detector state
//!
//! Run with: cargo run --example gesture_demo

use std::sync::Arc;
use std::time::Duration;

use panic_gesture_agent::{
    clock::{Clock, ManualClock},
    source::{ManualSource, MotionSample, ScreenToggleEvent, ScreenToggleKind},
    ChannelSink, Config, GestureEngine, GESTURE_GUIDE,
};

fn main() {
    println!("Panic Gesture Agent - Gesture Demo");
    println!("==================================");
    println!("{GESTURE_GUIDE}");

    let clock = ManualClock::new(0);
    let screen: Arc<ManualSource<ScreenToggleEvent>> =
        Arc::new(ManualSource::new("screen-broadcast"));
    let motion: Arc<ManualSource<MotionSample>> = Arc::new(ManualSource::new("accelerometer"));
    let (tx, rx) = crossbeam_channel::unbounded();

    let engine = match GestureEngine::new(
        &Config::default(),
        screen.clone(),
        motion.clone(),
        Arc::new(ChannelSink::new(tx)),
    ) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return;
        }
    };

    // The foreground service came up.
    if let Err(e) = engine.start() {
        eprintln!("Error starting engine: {e}");
        return;
    }
    println!("Engine state: {:?}", engine.state());
    println!();

    println!("Pressing power three times, 400 ms apart...");
    for kind in [
        ScreenToggleKind::ScreenOff,
        ScreenToggleKind::ScreenOn,
        ScreenToggleKind::ScreenOff,
    ] {
        screen.emit(ScreenToggleEvent::now(kind, &clock));
        clock.advance(400);
    }
    report(&rx);

    println!("Walking around (no chops)...");
    for i in 0..50 {
        let z = 9.81 + (i % 5) as f64;
        motion.emit(MotionSample::now(z, &clock));
        clock.advance(20);
    }
    report(&rx);

    println!("Chopping three times, 700 ms apart...");
    for _ in 0..3 {
        // One swing spans several samples; only the first counts.
        for z in [18.0, 24.0, 19.5] {
            motion.emit(MotionSample::now(z, &clock));
            clock.advance(20);
        }
        clock.advance(640);
    }
    report(&rx);

    println!("Two presses, then the service restarts...");
    screen.emit(ScreenToggleEvent::now(ScreenToggleKind::ScreenOff, &clock));
    clock.advance(300);
    screen.emit(ScreenToggleEvent::now(ScreenToggleKind::ScreenOn, &clock));
    engine.stop();
    engine.start().ok();
    println!(
        "Power-press count after restart: {:?}",
        engine
            .snapshot()
            .and_then(|s| s.power_press)
            .map(|s| s.count)
    );
    println!("Now at t={}ms", clock.now_ms());
    println!();

    println!("{}", engine.transparency_log().summary());
}

fn report(rx: &crossbeam_channel::Receiver<panic_gesture_agent::EmergencyDelivery>) {
    match rx.recv_timeout(Duration::from_millis(200)) {
        Ok(delivery) => println!(
            "  -> EMERGENCY from {} at t={}ms (id {})",
            delivery.trigger.source, delivery.trigger.at, delivery.id
        ),
        Err(_) => println!("  -> nothing"),
    }
    println!();
}
