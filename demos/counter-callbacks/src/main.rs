use rtlsim::{log_info, Scheduler, Signal};

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    // Create simulation with random seed 123
    let sim = Scheduler::new(123);
    let clk = Signal::new(&sim, 0u8);
    let count = Signal::new(&sim, 0u32);

    // Drive 16 clock edges, one every 5 ticks: 8 full periods.
    for i in 0..16u64 {
        clk.set_after(((i + 1) % 2) as u8, 5 * (i + 1));
    }

    // The counter increments on every rising edge of the clock.
    {
        let count = count.clone();
        clk.on_rising(move || count.set(count.get() + 1));
    }

    // Report every counter change with the simulated time it occurred at.
    {
        let sim2 = sim.clone();
        let count2 = count.clone();
        count.on_change(move || log_info!(sim2, "count is now {}", count2.get()));
    }

    // Fire once when the counter first reaches 5, whenever that happens.
    {
        let sim2 = sim.clone();
        let count2 = count.clone();
        count.when(|_, new| *new >= 5).bind_once(move || {
            log_info!(sim2, "watermark reached at count {}", count2.get());
        });
    }

    // Run until no records remain and print the outcome.
    let executed = sim.run();
    println!("Executed {} records, final count: {}", executed, count.get());
}
