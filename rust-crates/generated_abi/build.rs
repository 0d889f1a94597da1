fn main() {
    // abigen! reads the ABI at compile time; keep the bindings in step with it
    println!("cargo:rerun-if-changed=abi/DicePoker.json");
}
