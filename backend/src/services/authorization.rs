//! Role and ownership checks shared by every attendance and reporting operation.

use crate::error::AttendanceError;
use crate::models::subject::Subject;
use crate::models::user::{User, UserRole};

/// Grants access when `actor` holds one of `required` and, for non-admins,
/// is tied to `subject`: teachers must be its assigned teacher, students must
/// be enrolled.
pub fn authorize(
    actor: &User,
    subject: &Subject,
    required: &[UserRole],
) -> Result<(), AttendanceError> {
    require_role(actor, required)?;

    match actor.role {
        UserRole::Admin => Ok(()),
        UserRole::Teacher if subject.is_assigned_to(&actor.id) => Ok(()),
        UserRole::Teacher => Err(AttendanceError::Forbidden(
            "Only the assigned teacher can manage this subject".into(),
        )),
        UserRole::Student if subject.is_enrolled(&actor.id) => Ok(()),
        UserRole::Student => Err(AttendanceError::Forbidden(
            "Student is not enrolled in this subject".into(),
        )),
    }
}

/// Role-only check for operations that are not scoped to a subject.
pub fn require_role(actor: &User, required: &[UserRole]) -> Result<(), AttendanceError> {
    if required.contains(&actor.role) {
        Ok(())
    } else {
        Err(AttendanceError::Forbidden(format!(
            "Role `{}` is not allowed to perform this action",
            actor.role.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User::new("Test User".into(), "t@example.com".into(), "x".into(), role)
    }

    const STAFF: &[UserRole] = &[UserRole::Teacher, UserRole::Admin];

    #[test]
    fn admin_passes_without_assignment() {
        let admin = user(UserRole::Admin);
        let subject = Subject::new("AB123".into(), "Algebra".into(), None, None);
        assert!(authorize(&admin, &subject, STAFF).is_ok());
    }

    #[test]
    fn teacher_must_be_assigned() {
        let teacher = user(UserRole::Teacher);
        let other = Subject::new("AB123".into(), "Algebra".into(), None, None);
        assert!(matches!(
            authorize(&teacher, &other, STAFF),
            Err(AttendanceError::Forbidden(_))
        ));

        let own = Subject::new("CD456".into(), "Biology".into(), None, Some(teacher.id));
        assert!(authorize(&teacher, &own, STAFF).is_ok());
    }

    #[test]
    fn student_rejected_for_staff_actions_even_if_enrolled() {
        let student = user(UserRole::Student);
        let mut subject = Subject::new("AB123".into(), "Algebra".into(), None, None);
        subject.students.push(student.id);
        assert!(authorize(&student, &subject, STAFF).is_err());
        assert!(authorize(&student, &subject, &[UserRole::Student]).is_ok());
    }
}
