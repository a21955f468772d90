use clap::Parser;
use swiss_table::SwissTable;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Number of keys to delete after filling, to show freed slots.
    #[arg(short = 'd', long = "delete", default_value_t = 0)]
    delete: usize,

    /// Dump every group and occupied slot after filling.
    #[arg(short = 'v', long = "visualize")]
    visualize: bool,
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating SwissTable with target capacity: {}",
        args.target_capacity
    );

    let mut map: SwissTable<u64, u64> = SwissTable::with_capacity(args.target_capacity);

    println!(
        "Actual capacity: {} ({} slots)",
        map.capacity(),
        map.slots()
    );
    println!("Filling table with u64 values...");

    let num_values = map.capacity();
    for i in 0..num_values {
        let value = i as u64;
        if map.insert(value, value * 2).is_some() {
            panic!("Value already exists in table: {}", value);
        }
    }

    let deleted = (0..args.delete.min(num_values) as u64)
        .filter(|k| map.delete(k))
        .count();

    println!("Inserted {} values, deleted {}", num_values, deleted);
    println!(
        "Final load factor: {:.2}%",
        (map.len() as f64 / map.slots() as f64) * 100.0
    );

    map.probe_histogram().print();
    map.debug_stats().print();

    if args.visualize {
        println!("{}", map.visualize());
    }
}
