use skyway_core::model::{Aircraft, Seat, SeatClass};
use uuid::Uuid;

/// Column letter, window flag, aisle flag.
type Column = (char, bool, bool);

/// 2-2 cabin: A and D on the windows, B and C on the aisle.
const BUSINESS_COLUMNS: [Column; 4] = [
    ('A', true, false),
    ('B', false, true),
    ('C', false, true),
    ('D', true, false),
];

/// 3-3 cabin: A and F on the windows, C and D on the aisle.
const ECONOMY_COLUMNS: [Column; 6] = [
    ('A', true, false),
    ('B', false, false),
    ('C', false, true),
    ('D', false, true),
    ('E', false, false),
    ('F', true, false),
];

/// Builds the default seat map for an aircraft: business rows first, then
/// economy from the next row on. The last row of each cabin may be partial.
pub fn generate_layout(aircraft: &Aircraft) -> Vec<Seat> {
    let business_count = aircraft.business_seats.max(0) as usize;
    let economy_count = aircraft.economy_seats.max(0) as usize;
    let business_rows = business_count.div_ceil(BUSINESS_COLUMNS.len());

    let mut seats = Vec::with_capacity(business_count + economy_count);
    fill_cabin(&mut seats, aircraft.id, SeatClass::Business, &BUSINESS_COLUMNS, 1, business_count);
    fill_cabin(
        &mut seats,
        aircraft.id,
        SeatClass::Economy,
        &ECONOMY_COLUMNS,
        business_rows + 1,
        economy_count,
    );
    seats
}

fn fill_cabin(
    seats: &mut Vec<Seat>,
    aircraft_id: Uuid,
    class: SeatClass,
    columns: &[Column],
    first_row: usize,
    count: usize,
) {
    let rows = (first_row..).flat_map(|row| columns.iter().map(move |col| (row, col)));
    for (row, &(letter, window, aisle)) in rows.take(count) {
        seats.push(Seat {
            id: Uuid::new_v4(),
            aircraft_id,
            seat_number: format!("{}{}", row, letter),
            seat_class: class,
            is_available: true,
            is_window_seat: window,
            is_aisle_seat: aisle,
        });
    }
}
