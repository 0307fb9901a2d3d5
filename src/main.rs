fn main() {
    culture_events_lib::run()
}
