use phf_codegen::Map;
use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn main() {
    let path = Path::new(&env::var("OUT_DIR").unwrap()).join("rank_multipliers.rs");
    let mut file = BufWriter::new(File::create(&path).unwrap());

    // One prime per rank char; lookup keys are products of these, so the
    // mapping must stay injective over rank multisets. 'X' is the joker.
    let primes = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43];
    let ranks = [
        'A', '2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K', 'X',
    ];

    let mut map = Map::new();
    for (i, &rank) in ranks.iter().enumerate() {
        map.entry(rank, &primes[i].to_string());
    }

    writeln!(
        &mut file,
        "static RANK_MULTIPLIERS: phf::Map<char, u64> = {};",
        map.build()
    )
    .unwrap();
}
