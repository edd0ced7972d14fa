use balltrack::{Candidate, SpotsTracker, TrackerConfig};

const FPS: f64 = 120.0;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Tracking a synthetic rally with clutter and an occlusion...");

    let config = TrackerConfig {
        dynamic_depth: 30,
        output_latency: 30,
        absence_cost: 1.0,
        appearance_cost: 40.0,
        disappearance_cost: 40.0,
        ..Default::default()
    };
    let mut tracker = SpotsTracker::new(config)?;

    let mut found = 0;
    let mut total = 0;
    for frame in 0..240_i64 {
        let t = frame as f64 / FPS;
        let mut candidates = Vec::new();

        // ball moves at 1.5 m/s along the table, hidden by a foosman for 10 frames
        if !(100..110).contains(&frame) {
            candidates.push(Candidate::new(0.1 + 1.5 * t * 0.5, 0.34, 4.0));
        }
        // a static reflection and a flickering false positive
        candidates.push(Candidate::new(0.9, 0.1, 1.0));
        if frame % 7 == 0 {
            candidates.push(Candidate::new(0.2, 0.6, 3.5));
        }

        for estimate in tracker.push_and_drain(frame, t, candidates)? {
            total += 1;
            if let Some(p) = estimate.position {
                found += 1;
                if estimate.frame % 20 == 0 {
                    println!("  frame {:3}: ({:.3}, {:.3})", estimate.frame, p.x, p.y);
                }
            } else {
                println!("  frame {:3}: not found", estimate.frame);
            }
        }
    }

    let tail = tracker.drain_all()?;
    total += tail.len();
    found += tail.iter().filter(|e| e.is_found()).count();

    println!("\nEmitted {} frames, ball found in {}", total, found);
    Ok(())
}
