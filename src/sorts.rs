//! Sorting workloads driven by the demo. Timing never reaches in here;
//! these are opaque work units as far as the timers are concerned.

pub fn bubble_sort(items: &mut [i64]) {
    let mut n = items.len();
    while n > 1 {
        let mut last_swap = 0;
        for i in 1..n {
            if items[i - 1] > items[i] {
                items.swap(i - 1, i);
                last_swap = i;
            }
        }
        n = last_swap;
    }
}

pub fn selection_sort(items: &mut [i64]) {
    for i in 0..items.len() {
        let mut lowest = i;
        for j in i + 1..items.len() {
            if items[j] < items[lowest] {
                lowest = j;
            }
        }
        items.swap(i, lowest);
    }
}

pub fn merge_sort(items: &[i64]) -> Vec<i64> {
    if items.len() <= 1 {
        return items.to_vec();
    }
    let (left, right) = items.split_at(items.len() / 2);
    merge(&merge_sort(left), &merge_sort(right))
}

fn merge(left: &[i64], right: &[i64]) -> Vec<i64> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let (mut l, mut r) = (0, 0);
    while l < left.len() && r < right.len() {
        if left[l] <= right[r] {
            merged.push(left[l]);
            l += 1;
        } else {
            merged.push(right[r]);
            r += 1;
        }
    }
    merged.extend_from_slice(&left[l..]);
    merged.extend_from_slice(&right[r..]);
    merged
}
