//! Uses thread-local and shared pools of a few types, then prints the statistics table
//! reported by the process-wide monitor.

use std::num::NonZero;
use std::thread;

use slot_pool::{Mem, Monitor, construct, destruct, local, shared};

#[derive(Debug)]
struct Order {
    id: u64,
    quantity: u32,
}

fn main() {
    local::warm_up::<Order>(NonZero::new(16).unwrap()).unwrap();

    let mut orders = Vec::new();
    for id in 0..20 {
        let mut slot = local::get::<Order>();
        construct(&mut slot, Order { id, quantity: 1 });
        orders.push(slot);
    }

    let buffers = (0..3).map(|_| local::get_mem::<512>()).collect::<Vec<_>>();

    let shared_slots = thread::scope(|s| {
        let handles = (0..4)
            .map(|_| {
                s.spawn(|| {
                    let mut slot = shared::get::<String>();
                    construct(&mut slot, format!("{:?}", thread::current().id()));
                    slot
                })
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    });

    println!("{}", Monitor::global().stat());

    let total_quantity: u32 = orders.iter().map(|slot| slot.value().quantity).sum();
    println!(
        "{} orders with total quantity {total_quantity}, last id {}",
        orders.len(),
        orders.last().map_or(0, |slot| slot.value().id)
    );

    for mut slot in orders {
        destruct(&mut slot);
        local::ret(slot);
    }

    for slot in buffers {
        local::ret::<Mem<512>>(slot);
    }

    for mut slot in shared_slots {
        destruct(&mut slot);
        shared::ret(slot);
    }

    println!("{}", Monitor::global().stat());
}
