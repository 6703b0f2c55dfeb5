use proptest::prelude::*;

use course_progress::progress::percent;

mod common;
use common::{fixture_with_lessons, LEARNER};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn completing_k_of_n_rounds(n in 1usize..40, k_seed in 0usize..40) {
        let k = k_seed % (n + 1);
        let p = runtime().block_on(async {
            let fx = fixture_with_lessons(n);
            fx.enroll().await;
            for i in 0..k {
                fx.complete(i).await;
            }
            fx.engine.get_progress(LEARNER, fx.course.id).await.unwrap()
        });

        let expected = (100.0 * k as f64 / n as f64).round() as u8;
        prop_assert_eq!(p.percent, expected);
        prop_assert_eq!(p.is_complete, k == n);
        prop_assert_eq!(p.completed_lessons, k);
    }

    #[test]
    fn double_toggle_is_identity(n in 1usize..12, done_mask in any::<u16>(), target_seed in any::<usize>()) {
        let target = target_seed % n;
        runtime().block_on(async {
            let fx = fixture_with_lessons(n);
            fx.enroll().await;
            for i in (0..n).filter(|i| done_mask & (1 << i) != 0) {
                fx.complete(i).await;
            }
            let before = fx.engine.get_progress(LEARNER, fx.course.id).await.unwrap();

            let lesson = fx.lessons[target].id;
            fx.engine.toggle(LEARNER, fx.course.id, lesson).await.unwrap();
            fx.engine.toggle(LEARNER, fx.course.id, lesson).await.unwrap();

            let after = fx.engine.get_progress(LEARNER, fx.course.id).await.unwrap();
            assert_eq!(before.percent, after.percent);
            assert_eq!(before.per_lesson_status, after.per_lesson_status);
        });
    }

    #[test]
    fn percent_stays_in_range(total in 0usize..10_000, done in 0usize..10_000) {
        let p = percent(done, total);
        prop_assert!(p <= 100);
        prop_assert_eq!(p == 100, total > 0 && done >= total);
    }
}
