fn main() {
    speedread_lib::run()
}
