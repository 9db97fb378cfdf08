use rtlsim::{log_info, Scheduler, Signal, Wire};

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    // Create simulation with random seed 123
    let sim = Scheduler::new(123);
    let req = Signal::new(&sim, 0u8);
    let ack = Signal::new(&sim, 0u8);
    let data = Wire::new(0u32);

    // Producer: offers five items over a two-phase req/ack handshake, with
    // a random pause before each transfer.
    {
        let sim2 = sim.clone();
        let (req, ack, data) = (req.clone(), ack.clone(), data.clone());
        sim.spawn_once(async move {
            for item in 1..=5u32 {
                sim2.sleep(sim2.gen_range(5..15u64)).await;
                data.set(item * 11);
                req.set(1);
                log_info!(sim2, "producer: offering item {}", item * 11);
                ack.rising().await;
                req.set(0);
                ack.falling().await;
            }
            log_info!(sim2, "producer: all items sent");
        });
    }

    // Consumer: latches the payload on each request, models a random
    // processing time, then acknowledges.
    {
        let sim2 = sim.clone();
        let (req, ack, data) = (req.clone(), ack.clone(), data.clone());
        sim.spawn(async move {
            loop {
                req.rising().await;
                let item = data.get();
                sim2.sleep(sim2.gen_range(1..5u64)).await;
                log_info!(sim2, "consumer: accepted item {}", item);
                ack.set(1);
                req.falling().await;
                ack.set(0);
            }
        });
    }

    // Run until no records remain and print the outcome.
    let executed = sim.run();
    println!("Handshake complete after {} records", executed);
}
